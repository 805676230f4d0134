use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::achievement::{Achievement, UnlockOutcome};
use crate::model::module::{Module, ModuleKey};
use crate::model::record::{ProgressData, ProgressRecord};

/// Stats field the synchronizer stamps on every stats write.
pub const STATS_LAST_UPDATED_FIELD: &str = "lastUpdated";

/// Item id to record mapping of one module.
pub type ItemProgress = BTreeMap<String, ProgressRecord>;

//
// ─── CACHE ─────────────────────────────────────────────────────────────────────
//

/// In-memory progress of one user across every module.
///
/// Each top-level key is a field, so the cache is always fully populated;
/// missing keys in a persisted snapshot deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressCache {
    #[serde(default)]
    pub bokforing: ItemProgress,
    #[serde(default)]
    pub quiz: ItemProgress,
    #[serde(default)]
    pub analyse: ItemProgress,
    #[serde(default)]
    pub case_studies: ItemProgress,
    #[serde(default)]
    pub hjernetrim: ItemProgress,
    #[serde(default)]
    pub achievements: BTreeMap<String, Achievement>,
    #[serde(default)]
    pub stats: Map<String, Value>,
}

/// Outcome of merging a remote record into the cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Keys whose local value was replaced by the remote one.
    pub replaced: Vec<ModuleKey>,
    /// Keys present remotely whose value could not be decoded; local kept.
    pub rejected: Vec<(ModuleKey, String)>,
}

impl ProgressCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn module(&self, module: Module) -> &ItemProgress {
        match module {
            Module::Bokforing => &self.bokforing,
            Module::Quiz => &self.quiz,
            Module::Analyse => &self.analyse,
            Module::CaseStudies => &self.case_studies,
            Module::Hjernetrim => &self.hjernetrim,
        }
    }

    pub fn module_mut(&mut self, module: Module) -> &mut ItemProgress {
        match module {
            Module::Bokforing => &mut self.bokforing,
            Module::Quiz => &mut self.quiz,
            Module::Analyse => &mut self.analyse,
            Module::CaseStudies => &mut self.case_studies,
            Module::Hjernetrim => &mut self.hjernetrim,
        }
    }

    #[must_use]
    pub fn record(&self, module: Module, item_id: &str) -> Option<&ProgressRecord> {
        self.module(module).get(item_id)
    }

    /// Merges `data` into the record for `(module, item_id)`, creating it when
    /// absent, and returns the resulting record.
    pub fn apply(
        &mut self,
        module: Module,
        item_id: &str,
        data: &ProgressData,
        at: i64,
    ) -> ProgressRecord {
        let items = self.module_mut(module);
        match items.get_mut(item_id) {
            Some(record) => {
                record.merge(data, at);
                record.clone()
            }
            None => {
                let record = ProgressRecord::new(data, at);
                items.insert(item_id.to_owned(), record.clone());
                record
            }
        }
    }

    /// Records the achievement unless it is already present.
    pub fn unlock(&mut self, id: &str, at: i64) -> UnlockOutcome {
        if let Some(existing) = self.achievements.get(id) {
            return UnlockOutcome::AlreadyUnlocked(*existing);
        }
        let achievement = Achievement::unlocked_at(at);
        self.achievements.insert(id.to_owned(), achievement);
        UnlockOutcome::Unlocked(achievement)
    }

    /// Merges `fields` into the stats map (last write wins) and stamps
    /// `lastUpdated`. Returns the full set of written fields.
    pub fn merge_stats(&mut self, fields: &Map<String, Value>, at: i64) -> Map<String, Value> {
        let mut written = fields.clone();
        written.insert(STATS_LAST_UPDATED_FIELD.to_owned(), Value::from(at));
        for (key, value) in &written {
            self.stats.insert(key.clone(), value.clone());
        }
        written
    }

    /// Current JSON value stored under `key/item_id`, if any.
    ///
    /// For stats, `item_id` names a stats field.
    #[must_use]
    pub fn value_at(&self, key: ModuleKey, item_id: &str) -> Option<Value> {
        let item_module = match key {
            ModuleKey::Bokforing => Module::Bokforing,
            ModuleKey::Quiz => Module::Quiz,
            ModuleKey::Analyse => Module::Analyse,
            ModuleKey::CaseStudies => Module::CaseStudies,
            ModuleKey::Hjernetrim => Module::Hjernetrim,
            ModuleKey::Achievements => {
                return self
                    .achievements
                    .get(item_id)
                    .and_then(|a| serde_json::to_value(a).ok());
            }
            ModuleKey::Stats => return self.stats.get(item_id).cloned(),
        };
        self.record(item_module, item_id).map(ProgressRecord::to_value)
    }

    /// True when no module holds any entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        Module::ALL.iter().all(|m| self.module(*m).is_empty())
            && self.achievements.is_empty()
            && self.stats.is_empty()
    }

    /// Lays `newer` over this cache entry by entry. Item records merge field
    /// by field; an achievement already present here keeps its original
    /// unlock time.
    pub fn overlay(&mut self, newer: ProgressCache) {
        for module in Module::ALL {
            let items = self.module_mut(module);
            for (id, record) in newer.module(module) {
                match items.get_mut(id) {
                    Some(existing) => existing.absorb(record),
                    None => {
                        items.insert(id.clone(), record.clone());
                    }
                }
            }
        }
        for (id, achievement) in newer.achievements {
            self.achievements.entry(id).or_insert(achievement);
        }
        self.stats.extend(newer.stats);
    }

    /// Shallow merge of a remote user record: every key present remotely
    /// replaces the local value of that key; absent keys keep local values.
    pub fn merge_remote(&mut self, remote: &Map<String, Value>) -> MergeReport {
        let mut report = MergeReport::default();
        for key in ModuleKey::ALL {
            let Some(value) = remote.get(key.as_str()) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            match self.replace_key(key, value) {
                Ok(()) => report.replaced.push(key),
                Err(err) => report.rejected.push((key, err.to_string())),
            }
        }
        report
    }

    fn replace_key(&mut self, key: ModuleKey, value: &Value) -> Result<(), serde_json::Error> {
        let Some(map) = object_like(value) else {
            return Err(serde::de::Error::custom(format!(
                "expected an object for {key}, found {value}"
            )));
        };
        let value = Value::Object(map);
        match key {
            ModuleKey::Bokforing => self.bokforing = serde_json::from_value(value)?,
            ModuleKey::Quiz => self.quiz = serde_json::from_value(value)?,
            ModuleKey::Analyse => self.analyse = serde_json::from_value(value)?,
            ModuleKey::CaseStudies => self.case_studies = serde_json::from_value(value)?,
            ModuleKey::Hjernetrim => self.hjernetrim = serde_json::from_value(value)?,
            ModuleKey::Achievements => self.achievements = serde_json::from_value(value)?,
            ModuleKey::Stats => self.stats = serde_json::from_value(value)?,
        }
        Ok(())
    }
}

/// Document stores return keyed collections with dense numeric keys as
/// arrays; normalize those back to objects keyed by index.
fn object_like(value: &Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .enumerate()
                .filter(|(_, v)| !v.is_null())
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
        ),
        _ => None,
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
