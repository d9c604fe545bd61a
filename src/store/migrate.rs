// src/store/migrate.rs
//! Ordered, validated migration chain for the persisted warehouse document.
//!
//! Each step rewrites the raw JSON state from version N to N+1. The chain is
//! checked at construction: no gaps, no duplicate source versions.

use std::collections::HashSet;

use serde_json::Value;

use super::{StoreError, StoreResult};

pub type MigrateFn = fn(&mut Value) -> Result<(), String>;

pub struct MigrationStep {
    pub from_version: u32,
    pub description: &'static str,
    pub migrate_fn: MigrateFn,
}

/// What happened while bringing a document up to date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub original_version: u32,
    pub final_version: u32,
    pub steps_applied: u32,
    pub step_descriptions: Vec<&'static str>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.steps_applied == 0
    }
}

pub struct MigrationRegistry {
    steps: Vec<MigrationStep>,
    current_version: u32,
}

impl MigrationRegistry {
    /// # Panics
    ///
    /// Panics if the chain has duplicate source versions or does not cover
    /// every version from 0 to `current_version - 1`.
    pub fn new(mut steps: Vec<MigrationStep>, current_version: u32) -> Self {
        let mut seen = HashSet::new();
        for step in &steps {
            assert!(
                seen.insert(step.from_version),
                "Duplicate migration step for version {}",
                step.from_version
            );
        }
        for v in 0..current_version {
            assert!(
                seen.contains(&v),
                "Missing migration step from v{} to v{}",
                v,
                v + 1
            );
        }

        steps.sort_by_key(|s| s.from_version);
        Self {
            steps,
            current_version,
        }
    }

    pub fn current_version(&self) -> u32 {
        self.current_version
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Run every step from `version` up to the current version, in place.
    pub fn migrate(&self, version: u32, state: &mut Value) -> StoreResult<MigrationReport> {
        if version > self.current_version {
            return Err(StoreError::UnsupportedVersion {
                found: version,
                supported: self.current_version,
            });
        }

        let mut at = version;
        let mut step_descriptions = Vec::new();
        for step in self.steps.iter().filter(|s| s.from_version >= version) {
            if at >= self.current_version {
                break;
            }
            (step.migrate_fn)(state).map_err(|e| {
                StoreError::Migration(format!("v{} -> v{}: {}", step.from_version, step.from_version + 1, e))
            })?;
            at = step.from_version + 1;
            step_descriptions.push(step.description);
        }

        Ok(MigrationReport {
            original_version: version,
            final_version: at,
            steps_applied: step_descriptions.len() as u32,
            step_descriptions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bump(state: &mut Value) -> Result<(), String> {
        let n = state["n"].as_i64().unwrap_or(0);
        state["n"] = json!(n + 1);
        Ok(())
    }

    fn fail(_: &mut Value) -> Result<(), String> {
        Err("broken input".to_string())
    }

    fn registry() -> MigrationRegistry {
        MigrationRegistry::new(
            vec![
                MigrationStep { from_version: 1, description: "second", migrate_fn: bump },
                MigrationStep { from_version: 0, description: "first", migrate_fn: bump },
            ],
            2,
        )
    }

    #[test]
    fn test_migrates_in_version_order() {
        let mut state = json!({ "n": 0 });
        let report = registry().migrate(0, &mut state).unwrap();
        assert_eq!(state["n"], 2);
        assert_eq!(report.final_version, 2);
        assert_eq!(report.step_descriptions, vec!["first", "second"]);
    }

    #[test]
    fn test_partial_and_noop_migration() {
        let mut state = json!({ "n": 0 });
        let report = registry().migrate(1, &mut state).unwrap();
        assert_eq!(report.steps_applied, 1);
        assert_eq!(state["n"], 1);

        let report = registry().migrate(2, &mut state).unwrap();
        assert!(report.is_noop());
        assert_eq!(state["n"], 1);
    }

    #[test]
    fn test_rejects_future_version() {
        let mut state = json!({});
        let err = registry().migrate(3, &mut state).unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedVersion { found: 3, supported: 2 }));
    }

    #[test]
    fn test_step_failure_is_reported() {
        let registry = MigrationRegistry::new(
            vec![MigrationStep { from_version: 0, description: "fails", migrate_fn: fail }],
            1,
        );
        let err = registry.migrate(0, &mut json!({})).unwrap_err();
        assert!(err.to_string().contains("broken input"));
    }

    #[test]
    #[should_panic(expected = "Duplicate migration step")]
    fn test_rejects_duplicate_steps() {
        MigrationRegistry::new(
            vec![
                MigrationStep { from_version: 0, description: "a", migrate_fn: bump },
                MigrationStep { from_version: 0, description: "b", migrate_fn: bump },
            ],
            1,
        );
    }

    #[test]
    #[should_panic(expected = "Missing migration step from v1 to v2")]
    fn test_rejects_gaps() {
        MigrationRegistry::new(
            vec![MigrationStep { from_version: 0, description: "a", migrate_fn: bump }],
            2,
        );
    }
}
