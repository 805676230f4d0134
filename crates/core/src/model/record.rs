use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire name of the timestamp the synchronizer stamps on every write.
pub const LAST_ATTEMPT_FIELD: &str = "lastAttempt";

//
// ─── PROGRESS DATA ─────────────────────────────────────────────────────────────
//

/// Caller-supplied fields for one progress write.
///
/// Any `lastAttempt` supplied here is discarded: the synchronizer owns that
/// field and stamps it itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgressData(Map<String, Value>);

impl ProgressData {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_map(mut fields: Map<String, Value>) -> Self {
        fields.remove(LAST_ATTEMPT_FIELD);
        Self(fields)
    }

    /// Sets an arbitrary field.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        if key != LAST_ATTEMPT_FIELD {
            self.0.insert(key, value.into());
        }
        self
    }

    #[must_use]
    pub fn completed(self, completed: bool) -> Self {
        self.with("completed", completed)
    }

    #[must_use]
    pub fn score(self, score: f64) -> Self {
        self.with("score", score)
    }

    #[must_use]
    pub fn attempts(self, attempts: u64) -> Self {
        self.with("attempts", attempts)
    }

    #[must_use]
    pub fn correct(self, correct: u64) -> Self {
        self.with("correct", correct)
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fields of the remote partial update for this write: the supplied
    /// fields plus the stamp.
    #[must_use]
    pub fn to_update_fields(&self, stamped_at: i64) -> Map<String, Value> {
        let mut fields = self.0.clone();
        fields.insert(LAST_ATTEMPT_FIELD.to_owned(), Value::from(stamped_at));
        fields
    }
}

//
// ─── PROGRESS RECORD ───────────────────────────────────────────────────────────
//

/// Per-item learning-state snapshot.
///
/// Attributes are free-form; `completed`, `score`, `attempts` and `correct`
/// are the conventional ones and get typed accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    #[serde(rename = "lastAttempt", default)]
    last_attempt: i64,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

impl ProgressRecord {
    /// Builds a record from scratch, stamped at `at` (epoch ms).
    #[must_use]
    pub fn new(data: &ProgressData, at: i64) -> Self {
        Self {
            last_attempt: at,
            fields: data.0.clone(),
        }
    }

    /// Merges `data` into this record field by field (last write wins, no
    /// deep merge) and restamps it.
    pub fn merge(&mut self, data: &ProgressData, at: i64) {
        for (key, value) in &data.0 {
            self.fields.insert(key.clone(), value.clone());
        }
        self.last_attempt = at;
    }

    /// Lays a newer record over this one: its fields win, its stamp is kept.
    pub fn absorb(&mut self, newer: &ProgressRecord) {
        for (key, value) in &newer.fields {
            self.fields.insert(key.clone(), value.clone());
        }
        self.last_attempt = newer.last_attempt;
    }

    #[must_use]
    pub fn last_attempt(&self) -> i64 {
        self.last_attempt
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    #[must_use]
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// True only when the record carries `completed: true`.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self.fields.get("completed"), Some(Value::Bool(true)))
    }

    #[must_use]
    pub fn score(&self) -> Option<f64> {
        self.fields.get("score").and_then(Value::as_f64)
    }

    #[must_use]
    pub fn attempts(&self) -> Option<u64> {
        self.fields.get("attempts").and_then(Value::as_u64)
    }

    #[must_use]
    pub fn correct(&self) -> Option<u64> {
        self.fields.get("correct").and_then(Value::as_u64)
    }

    /// Full JSON form, as written to the remote store.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = self.fields.clone();
        map.insert(LAST_ATTEMPT_FIELD.to_owned(), Value::from(self.last_attempt));
        Value::Object(map)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn caller_supplied_last_attempt_is_dropped() {
        let data = ProgressData::new().completed(true).with(LAST_ATTEMPT_FIELD, 5);
        assert!(data.fields().get(LAST_ATTEMPT_FIELD).is_none());

        let mut map = Map::new();
        map.insert(LAST_ATTEMPT_FIELD.into(), json!(5));
        map.insert("score".into(), json!(10));
        let data = ProgressData::from_map(map);
        let record = ProgressRecord::new(&data, 99);
        assert_eq!(record.last_attempt(), 99);
        assert_eq!(record.score(), Some(10.0));
    }

    #[test]
    fn merge_overwrites_fields_and_keeps_the_rest() {
        let mut record = ProgressRecord::new(&ProgressData::new().score(40.0).attempts(1), 1);
        record.merge(&ProgressData::new().score(80.0).completed(true), 2);

        assert_eq!(record.score(), Some(80.0));
        assert_eq!(record.attempts(), Some(1));
        assert!(record.is_completed());
        assert_eq!(record.last_attempt(), 2);
    }

    #[test]
    fn merge_replaces_nested_values_wholesale() {
        let mut record = ProgressRecord::new(
            &ProgressData::new().with("answers", json!({"a": 1, "b": 2})),
            1,
        );
        record.merge(&ProgressData::new().with("answers", json!({"c": 3})), 2);
        assert_eq!(record.get("answers"), Some(&json!({"c": 3})));
    }

    #[test]
    fn serializes_with_camel_case_stamp() {
        let record = ProgressRecord::new(&ProgressData::new().correct(3), 1234);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value, json!({"lastAttempt": 1234, "correct": 3}));
        assert_eq!(record.to_value(), value);

        let back: ProgressRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn completed_requires_literal_true() {
        let record = ProgressRecord::new(&ProgressData::new().with("completed", "yes"), 0);
        assert!(!record.is_completed());
    }

    #[test]
    fn update_fields_carry_stamp() {
        let fields = ProgressData::new().score(1.0).to_update_fields(7);
        assert_eq!(Value::Object(fields), json!({"score": 1.0, "lastAttempt": 7}));
    }
}
