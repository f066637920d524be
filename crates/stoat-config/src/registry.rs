// Registry — layered composition of named experiment configurations
//
// Resolution order for a registered experiment:
//
//   base defaults  →  per-experiment overrides  →  task-derived fields
//
// Shallow union, later writer wins key-by-key (no deep merge of nested
// structures). Task-derived fields are applied last, so every experiment
// inherits its task's class list without repeating it while structural
// hyperparameters (epochs, model type, directories) stay freely
// overridable per experiment.

use std::collections::BTreeMap;

use crate::error::{ConfigError, Result};
use crate::experiment::{ExperimentConfig, RawConfig};
use crate::task::{builtin_tasks, Task};
use crate::value::{mismatch, ConfigValue};

/// Process-wide mapping from experiment name to resolved configuration.
///
/// Built once at startup by iterating a static registration list; read-only
/// thereafter.
#[derive(Debug)]
pub struct Registry {
    tasks: BTreeMap<String, Task>,
    /// Post-merge, pre-task maps — kept so CLI overrides can re-resolve.
    raw: BTreeMap<String, RawConfig>,
    resolved: BTreeMap<String, ExperimentConfig>,
}

impl Registry {
    /// Empty registry over the built-in task table.
    pub fn new() -> Self {
        Self::with_tasks(builtin_tasks())
    }

    /// Empty registry over a caller-supplied task table.
    pub fn with_tasks(tasks: BTreeMap<String, Task>) -> Self {
        Registry {
            tasks,
            raw: BTreeMap::new(),
            resolved: BTreeMap::new(),
        }
    }

    pub fn tasks(&self) -> &BTreeMap<String, Task> {
        &self.tasks
    }

    /// Register an experiment under `name`.
    ///
    /// Merges `base` (if any) with `overrides`, then applies the fields
    /// derived from the referenced task. Fails with `UnknownTask` when the
    /// merged `task` key is absent from the task table.
    pub fn register(
        &mut self,
        name: &str,
        overrides: RawConfig,
        base: Option<&RawConfig>,
    ) -> Result<()> {
        let mut merged = base.cloned().unwrap_or_default();
        merged.extend(overrides);

        let resolved = self.resolve(name, merged.clone())?;
        self.raw.insert(name.to_string(), merged);
        self.resolved.insert(name.to_string(), resolved);
        Ok(())
    }

    /// Resolved configuration for `name`, or `UnknownExperiment`.
    pub fn get(&self, name: &str) -> Result<&ExperimentConfig> {
        self.resolved
            .get(name)
            .ok_or_else(|| ConfigError::UnknownExperiment(name.to_string()))
    }

    /// Registered experiment names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.resolved.keys().map(|s| s.as_str()).collect()
    }

    /// Re-resolve an experiment with command-line style overrides.
    ///
    /// Overriding the task re-runs the full merge, so the task-derived
    /// class list stays consistent with the override.
    pub fn resolve_with(
        &self,
        name: &str,
        task: Option<&str>,
        model: Option<&str>,
    ) -> Result<ExperimentConfig> {
        let mut merged = self
            .raw
            .get(name)
            .ok_or_else(|| ConfigError::UnknownExperiment(name.to_string()))?
            .clone();
        if let Some(t) = task {
            merged.insert("task".to_string(), t.into());
        }
        if let Some(m) = model {
            merged.insert("model_type".to_string(), m.into());
        }
        self.resolve(name, merged)
    }

    /// Apply task-derived fields (always last, always winning) and extract
    /// the typed configuration.
    fn resolve(&self, name: &str, mut merged: RawConfig) -> Result<ExperimentConfig> {
        let task_name = match merged.get("task") {
            Some(ConfigValue::Str(s)) => s.clone(),
            Some(v) => return Err(mismatch("task", "string", v)),
            None => {
                return Err(ConfigError::MissingKey {
                    experiment: name.to_string(),
                    key: "task".to_string(),
                })
            }
        };

        let task = self
            .tasks
            .get(&task_name)
            .ok_or_else(|| ConfigError::UnknownTask {
                experiment: name.to_string(),
                task: task_name.clone(),
            })?;

        let classes = match &task.classes {
            Some(cs) => ConfigValue::StrList(cs.clone()),
            None => ConfigValue::None,
        };
        merged.insert("classes".to_string(), classes);

        ExperimentConfig::from_raw(name, merged)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, ConfigValue)]) -> RawConfig {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn base_then_overrides_then_task() {
        let mut reg = Registry::new();
        let base = raw(&[
            ("task", "2c_easy".into()),
            ("epochs", 100usize.into()),
            ("dropout", 0.9.into()),
        ]);
        reg.register(
            "exp",
            raw(&[("epochs", 20usize.into()), ("model_type", "lstm".into())]),
            Some(&base),
        )
        .unwrap();

        let cfg = reg.get("exp").unwrap();
        assert_eq!(cfg.epochs, 20); // override beats base
        assert_eq!(cfg.dropout, 0.9); // base survives where not overridden
        assert_eq!(cfg.model_type, "lstm");
        assert_eq!(
            cfg.classes.as_deref(),
            Some(&["cooking".to_string(), "walking".to_string()][..])
        );
    }

    #[test]
    fn task_classes_always_win() {
        // A stray `classes` from base or overrides must never survive the
        // task-derived merge.
        let mut reg = Registry::new();
        let base = raw(&[
            ("task", "2c_hard".into()),
            ("classes", ConfigValue::StrList(vec!["bogus".into()])),
        ]);
        reg.register(
            "exp",
            raw(&[("classes", ConfigValue::StrList(vec!["also_bogus".into()]))]),
            Some(&base),
        )
        .unwrap();

        let cfg = reg.get("exp").unwrap();
        assert_eq!(
            cfg.classes.as_deref(),
            Some(&["running".to_string(), "walking".to_string()][..])
        );
    }

    #[test]
    fn full_task_yields_no_classes() {
        let mut reg = Registry::new();
        reg.register("exp", raw(&[("task", "full".into())]), None)
            .unwrap();
        assert!(reg.get("exp").unwrap().classes.is_none());
    }

    #[test]
    fn unknown_task_fails_at_register() {
        let mut reg = Registry::new();
        let err = reg
            .register("exp", raw(&[("task", "42c".into())]), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTask { .. }));
    }

    #[test]
    fn unknown_experiment_fails_at_get() {
        let reg = Registry::new();
        assert!(matches!(
            reg.get("nope"),
            Err(ConfigError::UnknownExperiment(_))
        ));
    }

    #[test]
    fn override_task_reresolves_classes() {
        let mut reg = Registry::new();
        reg.register("exp", raw(&[("task", "2c_easy".into())]), None)
            .unwrap();

        let cfg = reg.resolve_with("exp", Some("10c"), Some("convlstm")).unwrap();
        assert_eq!(cfg.task, "10c");
        assert_eq!(cfg.n_classes(), Some(10));
        assert_eq!(cfg.model_type, "convlstm");

        // the stored config is untouched
        assert_eq!(reg.get("exp").unwrap().task, "2c_easy");
    }
}
