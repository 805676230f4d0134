use serde::{Deserialize, Serialize};

/// An unlocked achievement. Once recorded it is never overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    #[serde(rename = "unlockedAt")]
    pub unlocked_at: i64,
}

impl Achievement {
    #[must_use]
    pub fn unlocked_at(at: i64) -> Self {
        Self { unlocked_at: at }
    }
}

/// Result of an unlock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    Unlocked(Achievement),
    /// Nothing was written; carries the original record.
    AlreadyUnlocked(Achievement),
}

impl UnlockOutcome {
    #[must_use]
    pub fn achievement(self) -> Achievement {
        match self {
            UnlockOutcome::Unlocked(a) | UnlockOutcome::AlreadyUnlocked(a) => a,
        }
    }

    #[must_use]
    pub fn is_new(self) -> bool {
        matches!(self, UnlockOutcome::Unlocked(_))
    }
}
