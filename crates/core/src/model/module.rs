use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown progress module: {0}")]
pub struct ParseModuleError(pub String);

//
// ─── ITEM MODULES ──────────────────────────────────────────────────────────────
//

/// Learning-content category whose items carry a [`ProgressRecord`].
///
/// [`ProgressRecord`]: crate::model::ProgressRecord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    /// Bookkeeping exercise tracking.
    Bokforing,
    Quiz,
    /// Financial statement analysis.
    Analyse,
    CaseStudies,
    /// Brain-training puzzles.
    Hjernetrim,
}

impl Module {
    pub const ALL: [Module; 5] = [
        Module::Bokforing,
        Module::Quiz,
        Module::Analyse,
        Module::CaseStudies,
        Module::Hjernetrim,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        ModuleKey::from(self).as_str()
    }

    /// Number of items the module ships with; the denominator of its progress.
    #[must_use]
    pub fn total_items(self) -> u32 {
        match self {
            Module::Bokforing => 36,
            Module::Quiz => 245,
            Module::Analyse => 11,
            Module::CaseStudies => 15,
            Module::Hjernetrim => 10,
        }
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Module {
    type Err = ParseModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<ModuleKey>()? {
            ModuleKey::Bokforing => Ok(Module::Bokforing),
            ModuleKey::Quiz => Ok(Module::Quiz),
            ModuleKey::Analyse => Ok(Module::Analyse),
            ModuleKey::CaseStudies => Ok(Module::CaseStudies),
            ModuleKey::Hjernetrim => Ok(Module::Hjernetrim),
            ModuleKey::Achievements | ModuleKey::Stats => Err(ParseModuleError(s.to_owned())),
        }
    }
}

//
// ─── TOP-LEVEL KEYS ────────────────────────────────────────────────────────────
//

/// Every top-level key of a user's progress record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKey {
    Bokforing,
    Quiz,
    Analyse,
    CaseStudies,
    Hjernetrim,
    Achievements,
    Stats,
}

impl ModuleKey {
    pub const ALL: [ModuleKey; 7] = [
        ModuleKey::Bokforing,
        ModuleKey::Quiz,
        ModuleKey::Analyse,
        ModuleKey::CaseStudies,
        ModuleKey::Hjernetrim,
        ModuleKey::Achievements,
        ModuleKey::Stats,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKey::Bokforing => "bokforing",
            ModuleKey::Quiz => "quiz",
            ModuleKey::Analyse => "analyse",
            ModuleKey::CaseStudies => "case_studies",
            ModuleKey::Hjernetrim => "hjernetrim",
            ModuleKey::Achievements => "achievements",
            ModuleKey::Stats => "stats",
        }
    }
}

impl From<Module> for ModuleKey {
    fn from(module: Module) -> Self {
        match module {
            Module::Bokforing => ModuleKey::Bokforing,
            Module::Quiz => ModuleKey::Quiz,
            Module::Analyse => ModuleKey::Analyse,
            Module::CaseStudies => ModuleKey::CaseStudies,
            Module::Hjernetrim => ModuleKey::Hjernetrim,
        }
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKey {
    type Err = ParseModuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModuleKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| ParseModuleError(s.to_owned()))
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
