use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::cache::ProgressCache;
use crate::model::module::Module;

/// Completion of one module against its fixed item count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleProgress {
    pub completed: u32,
    pub total: u32,
}

/// Aggregate completion across every item module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverallProgress {
    pub modules: BTreeMap<Module, ModuleProgress>,
    pub completed: u32,
    pub total: u32,
    pub percent: u32,
}

impl OverallProgress {
    /// Computes the aggregate from the cache alone.
    #[must_use]
    pub fn from_cache(cache: &ProgressCache) -> Self {
        let modules: BTreeMap<Module, ModuleProgress> = Module::ALL
            .into_iter()
            .map(|module| {
                let completed = cache
                    .module(module)
                    .values()
                    .filter(|r| r.is_completed())
                    .count();
                let progress = ModuleProgress {
                    completed: u32::try_from(completed).unwrap_or(u32::MAX),
                    total: module.total_items(),
                };
                (module, progress)
            })
            .collect();

        let completed = modules.values().map(|m| m.completed).sum();
        let total = modules.values().map(|m| m.total).sum();

        Self {
            modules,
            completed,
            total,
            percent: percent(completed, total),
        }
    }

    #[must_use]
    pub fn module(&self, module: Module) -> ModuleProgress {
        self.modules[&module]
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(completed: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (f64::from(completed) / f64::from(total) * 100.0).round() as u32
}
