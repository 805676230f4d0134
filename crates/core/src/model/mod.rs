mod achievement;
mod cache;
mod ids;
pub mod legacy;
mod module;
mod overall;
mod pending;
mod record;

pub use achievement::{Achievement, UnlockOutcome};
pub use cache::{ItemProgress, MergeReport, ProgressCache, STATS_LAST_UPDATED_FIELD};
pub use ids::{PathSegmentError, RESERVED_SEGMENT_CHARS, UserId, validate_path_segment};
pub use legacy::{LEGACY_BOKFORING_KEY, LEGACY_QUIZ_KEY, LegacyImport};
pub use module::{Module, ModuleKey, ParseModuleError};
pub use overall::{ModuleProgress, OverallProgress};
pub use pending::{PendingUpdate, distinct_keys};
pub use record::{LAST_ATTEMPT_FIELD, ProgressData, ProgressRecord};
