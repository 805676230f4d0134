use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque identity issued by the anonymous sign-in collaborator.
///
/// Every remote path of a user is namespaced under this id.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a new `UserId` after checking it is usable as a path segment.
    ///
    /// # Errors
    ///
    /// Returns `PathSegmentError` if the id is empty or contains a reserved character.
    pub fn new(id: impl Into<String>) -> Result<Self, PathSegmentError> {
        let id = id.into();
        validate_path_segment(&id)?;
        Ok(Self(id))
    }

    /// Returns the underlying string value
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UserId({})", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = PathSegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ─── Path Segments ─────────────────────────────────────────────────────────────

/// Characters the remote document store refuses inside a key.
pub const RESERVED_SEGMENT_CHARS: [char; 6] = ['.', '$', '#', '[', ']', '/'];

/// Error for ids that cannot be used as one segment of a remote path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PathSegmentError {
    #[error("path segment cannot be empty")]
    Empty,
    #[error("path segment {segment:?} contains reserved character {ch:?}")]
    ReservedChar { segment: String, ch: char },
}

/// Checks that `segment` is a single non-empty key of a remote path.
///
/// # Errors
///
/// Returns `PathSegmentError` when the segment is empty or contains one of
/// [`RESERVED_SEGMENT_CHARS`].
pub fn validate_path_segment(segment: &str) -> Result<(), PathSegmentError> {
    if segment.trim().is_empty() {
        return Err(PathSegmentError::Empty);
    }
    if let Some(ch) = segment.chars().find(|c| RESERVED_SEGMENT_CHARS.contains(c)) {
        return Err(PathSegmentError::ReservedChar {
            segment: segment.to_owned(),
            ch,
        });
    }
    Ok(())
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_display_is_raw_value() {
        let id = UserId::new("anon-42").unwrap();
        assert_eq!(id.to_string(), "anon-42");
        assert_eq!(format!("{id:?}"), "UserId(anon-42)");
    }

    #[test]
    fn user_id_from_str_rejects_slashes() {
        let err = "a/b".parse::<UserId>().unwrap_err();
        assert_eq!(
            err,
            PathSegmentError::ReservedChar {
                segment: "a/b".into(),
                ch: '/'
            }
        );
    }

    #[test]
    fn empty_segment_is_rejected() {
        assert_eq!(validate_path_segment("  "), Err(PathSegmentError::Empty));
        assert!(validate_path_segment("ex-1").is_ok());
    }

    #[test]
    fn user_id_serializes_as_plain_string() {
        let id = UserId::new("u1").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"u1\"");
    }
}
