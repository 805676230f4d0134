use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::module::ModuleKey;

/// A write that has not been confirmed by the remote store.
///
/// Only `(module, item_id)` decides what resync sends: the value is re-read
/// from the cache at resync time, so `data` is kept for diagnostics and for
/// reloading a queue written by older clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub module: ModuleKey,
    #[serde(rename = "itemId")]
    pub item_id: String,
    #[serde(default)]
    pub data: Value,
}

impl PendingUpdate {
    #[must_use]
    pub fn new(module: ModuleKey, item_id: impl Into<String>, data: Value) -> Self {
        Self {
            module,
            item_id: item_id.into(),
            data,
        }
    }
}

/// Distinct `(module, item_id)` keys of `queue`, in first-queued order.
#[must_use]
pub fn distinct_keys(queue: &[PendingUpdate]) -> Vec<(ModuleKey, String)> {
    let mut seen = HashSet::new();
    queue
        .iter()
        .filter(|u| seen.insert((u.module, u.item_id.as_str())))
        .map(|u| (u.module, u.item_id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn distinct_keys_collapse_duplicates_in_order() {
        let queue = vec![
            PendingUpdate::new(ModuleKey::Quiz, "q2", json!({"score": 1})),
            PendingUpdate::new(ModuleKey::Bokforing, "b1", json!({})),
            PendingUpdate::new(ModuleKey::Quiz, "q2", json!({"score": 2})),
        ];
        assert_eq!(
            distinct_keys(&queue),
            vec![
                (ModuleKey::Quiz, "q2".to_string()),
                (ModuleKey::Bokforing, "b1".to_string())
            ]
        );
    }

    #[test]
    fn wire_shape_uses_item_id_camel_case() {
        let update = PendingUpdate::new(ModuleKey::CaseStudies, "c1", json!({"completed": true}));
        let value = serde_json::to_value(&update).unwrap();
        assert_eq!(
            value,
            json!({"module": "case_studies", "itemId": "c1", "data": {"completed": true}})
        );
    }
}
