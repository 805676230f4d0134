//! Progress kept by the game before the synchronizer existed.
//!
//! Two local keys are understood. `bokforingProgress` is completion-style:
//! an array of finished exercise ids, or an object keyed by exercise id.
//! `quizProgress` is counter-style: an object keyed by quiz id whose numeric
//! counters are carried over.

use serde_json::{Map, Value};

use crate::model::cache::ProgressCache;
use crate::model::module::Module;
use crate::model::record::ProgressData;

pub const LEGACY_BOKFORING_KEY: &str = "bokforingProgress";
pub const LEGACY_QUIZ_KEY: &str = "quizProgress";

/// Count of records taken from each legacy key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LegacyImport {
    pub bokforing: usize,
    pub quiz: usize,
}

impl LegacyImport {
    #[must_use]
    pub fn total(&self) -> usize {
        self.bokforing + self.quiz
    }
}

/// Completed exercise ids from a raw `bokforingProgress` value.
///
/// Object entries whose value is `false` or `null` are skipped.
#[must_use]
pub fn completed_exercises(raw: &Value) -> Vec<String> {
    match raw {
        Value::Array(items) => items.iter().filter_map(id_of).collect(),
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| !matches!(v, Value::Bool(false) | Value::Null))
            .map(|(k, _)| k.clone())
            .collect(),
        _ => Vec::new(),
    }
}

/// Per-quiz counters from a raw `quizProgress` value.
#[must_use]
pub fn quiz_counters(raw: &Value) -> Vec<(String, ProgressData)> {
    let Value::Object(map) = raw else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(id, entry)| {
            let data = match entry {
                Value::Number(n) => ProgressData::new().with("score", n.clone()),
                Value::Object(fields) => ProgressData::from_map(carried_fields(fields)),
                _ => return None,
            };
            (!data.is_empty()).then(|| (id.clone(), data))
        })
        .collect()
}

/// Folds legacy values into `cache`, stamping every record at `at`.
pub fn migrate_into(
    cache: &mut ProgressCache,
    bokforing: Option<&Value>,
    quiz: Option<&Value>,
    at: i64,
) -> LegacyImport {
    let mut import = LegacyImport::default();

    if let Some(raw) = bokforing {
        let done = ProgressData::new().completed(true);
        for id in completed_exercises(raw) {
            cache.apply(Module::Bokforing, &id, &done, at);
            import.bokforing += 1;
        }
    }

    if let Some(raw) = quiz {
        for (id, data) in quiz_counters(raw) {
            cache.apply(Module::Quiz, &id, &data, at);
            import.quiz += 1;
        }
    }

    import
}

fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn carried_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .filter(|(_, v)| v.is_number() || v.is_boolean())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}
