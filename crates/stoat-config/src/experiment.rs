// ExperimentConfig — the typed view of a fully merged configuration

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::value::{expect_bool, expect_f64, expect_str, expect_usize, mismatch, ConfigValue};

/// A flat, merged configuration map.
pub type RawConfig = BTreeMap<String, ConfigValue>;

/// Keys the typed struct extracts. Everything else lands in `extra` and is
/// passed through opaquely (model hyperparameters, pretrained-weight paths,
/// ensemble definitions).
const KNOWN_KEYS: &[&str] = &[
    "description",
    "task",
    "classes",
    "model_type",
    "epochs",
    "batch_size",
    "dropout",
    "shuffle",
    "seed",
    "stopping_patience",
    "workers",
    "max_queue_size",
    "seq_length",
    "min_seq_length",
    "sample_step",
    "seq_overlap",
    "pad_sequences",
    "max_seq_per_source",
    "average_predictions",
    "rescale",
    "input_shape",
    "input_height",
    "input_width",
    "input_channels",
    "hidden_dims",
    "output_mode",
    "base_results_dir",
    "training_data_dir",
    "validation_data_dir",
    "test_data_dir",
    "training_index_start",
    "training_max_per_class",
    "validation_index_start",
    "validation_max_per_class",
    "test_index_start",
    "test_max_per_class",
];

/// A fully resolved experiment configuration.
///
/// Produced by [`Registry::register`](crate::Registry::register) from the
/// layered merge of a base config, per-experiment overrides, and the
/// referenced task's class list (applied last, so it always wins).
/// Read-only after resolution.
///
/// The original parameter map survives in full: `dump()` renders every
/// merged key, and keys the struct does not model are kept in `extra`.
#[derive(Debug, Clone)]
pub struct ExperimentConfig {
    pub name: String,
    pub description: Option<String>,
    /// Name of the task this experiment resolves its class list from.
    pub task: String,
    /// Task-derived class list; `None` means "infer from disk".
    pub classes: Option<Vec<String>>,
    pub model_type: String,
    pub epochs: usize,
    pub batch_size: usize,
    pub dropout: f64,
    pub shuffle: bool,
    /// Explicit shuffle seed; `None` uses a thread-local RNG.
    pub seed: Option<u64>,
    /// Early-stopping patience in epochs; `None` disables early stopping.
    pub stopping_patience: Option<usize>,
    /// Worker threads for parallel sample loading (0 = sequential).
    pub workers: usize,
    /// Prefetch depth for the batch pipeline.
    pub max_queue_size: usize,

    /// Temporal window length; `None` means single-frame mode.
    pub seq_length: Option<usize>,
    pub min_seq_length: Option<usize>,
    pub sample_step: usize,
    pub seq_overlap: usize,
    pub pad_sequences: bool,
    pub max_seq_per_source: Option<usize>,
    pub average_predictions: bool,
    pub rescale: Option<f64>,

    pub input_shape: Option<Vec<usize>>,
    pub input_height: Option<usize>,
    pub input_width: Option<usize>,
    pub input_channels: Option<usize>,
    pub hidden_dims: Option<Vec<usize>>,
    pub output_mode: Option<String>,

    pub base_results_dir: PathBuf,
    pub training_data_dir: Option<PathBuf>,
    pub validation_data_dir: Option<PathBuf>,
    pub test_data_dir: Option<PathBuf>,

    pub training_index_start: Option<f64>,
    pub training_max_per_class: Option<f64>,
    pub validation_index_start: Option<f64>,
    pub validation_max_per_class: Option<f64>,
    pub test_index_start: Option<f64>,
    pub test_max_per_class: Option<f64>,

    /// Unmodeled keys, passed through for forward compatibility.
    pub extra: RawConfig,

    /// The complete merged map this config was extracted from.
    raw: RawConfig,
}

impl ExperimentConfig {
    /// Extract the typed config from a merged map.
    ///
    /// Fails with `TypeMismatch` when a known key carries a value of the
    /// wrong type. An explicit `None` value reads as an absent optional.
    pub fn from_raw(name: &str, raw: RawConfig) -> Result<Self> {
        let g = |key: &str| raw.get(key).filter(|v| !v.is_none());

        let task = match g("task") {
            Some(v) => expect_str("task", v)?,
            None => {
                return Err(ConfigError::MissingKey {
                    experiment: name.to_string(),
                    key: "task".to_string(),
                })
            }
        };

        let classes = match g("classes") {
            Some(ConfigValue::StrList(cs)) => Some(cs.clone()),
            Some(v) => return Err(mismatch("classes", "string list", v)),
            None => None,
        };

        let opt_str = |key: &str| -> Result<Option<String>> {
            g(key).map(|v| expect_str(key, v)).transpose()
        };
        let opt_usize = |key: &str| -> Result<Option<usize>> {
            g(key).map(|v| expect_usize(key, v)).transpose()
        };
        let opt_f64 = |key: &str| -> Result<Option<f64>> {
            g(key).map(|v| expect_f64(key, v)).transpose()
        };
        let opt_bool = |key: &str| -> Result<Option<bool>> {
            g(key).map(|v| expect_bool(key, v)).transpose()
        };
        let opt_path =
            |key: &str| -> Result<Option<PathBuf>> { Ok(opt_str(key)?.map(PathBuf::from)) };
        let opt_usize_list = |key: &str| -> Result<Option<Vec<usize>>> {
            match g(key) {
                Some(ConfigValue::IntList(xs)) => {
                    let mut out = Vec::with_capacity(xs.len());
                    for &x in xs {
                        if x < 0 {
                            return Err(mismatch(key, "non-negative int list", &xs.clone().into()));
                        }
                        out.push(x as usize);
                    }
                    Ok(Some(out))
                }
                Some(v) => Err(mismatch(key, "int list", v)),
                None => Ok(None),
            }
        };

        let extra: RawConfig = raw
            .iter()
            .filter(|(k, _)| !KNOWN_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(ExperimentConfig {
            name: name.to_string(),
            description: opt_str("description")?,
            task,
            classes,
            model_type: opt_str("model_type")?.unwrap_or_else(|| "convnet".to_string()),
            epochs: opt_usize("epochs")?.unwrap_or(10),
            batch_size: opt_usize("batch_size")?.unwrap_or(10),
            dropout: opt_f64("dropout")?.unwrap_or(0.5),
            shuffle: opt_bool("shuffle")?.unwrap_or(false),
            seed: opt_usize("seed")?.map(|s| s as u64),
            stopping_patience: match raw.get("stopping_patience") {
                Some(ConfigValue::None) => None,
                Some(v) => Some(expect_usize("stopping_patience", v)?),
                None => Some(3),
            },
            workers: opt_usize("workers")?.unwrap_or(1),
            max_queue_size: opt_usize("max_queue_size")?.unwrap_or(10),
            seq_length: opt_usize("seq_length")?,
            min_seq_length: opt_usize("min_seq_length")?,
            sample_step: opt_usize("sample_step")?.unwrap_or(1),
            seq_overlap: opt_usize("seq_overlap")?.unwrap_or(0),
            pad_sequences: opt_bool("pad_sequences")?.unwrap_or(false),
            max_seq_per_source: opt_usize("max_seq_per_source")?,
            average_predictions: opt_bool("average_predictions")?.unwrap_or(false),
            rescale: opt_f64("rescale")?,
            input_shape: opt_usize_list("input_shape")?,
            input_height: opt_usize("input_height")?,
            input_width: opt_usize("input_width")?,
            input_channels: opt_usize("input_channels")?,
            hidden_dims: opt_usize_list("hidden_dims")?,
            output_mode: opt_str("output_mode")?,
            base_results_dir: opt_path("base_results_dir")?
                .unwrap_or_else(|| PathBuf::from("./results")),
            training_data_dir: opt_path("training_data_dir")?,
            validation_data_dir: opt_path("validation_data_dir")?,
            test_data_dir: opt_path("test_data_dir")?,
            training_index_start: opt_f64("training_index_start")?,
            training_max_per_class: opt_f64("training_max_per_class")?,
            validation_index_start: opt_f64("validation_index_start")?,
            validation_max_per_class: opt_f64("validation_max_per_class")?,
            test_index_start: opt_f64("test_index_start")?,
            test_max_per_class: opt_f64("test_max_per_class")?,
            extra,
            raw,
        })
    }

    /// Number of classes, when the task pins them.
    pub fn n_classes(&self) -> Option<usize> {
        self.classes.as_ref().map(|c| c.len())
    }

    /// Target spatial size as (height, width).
    ///
    /// Either the first two dims of `input_shape` (h, w, c convention) or
    /// the explicit `input_height`/`input_width` pair.
    pub fn target_size(&self) -> Option<(u32, u32)> {
        if let Some(shape) = &self.input_shape {
            if shape.len() >= 2 {
                return Some((shape[0] as u32, shape[1] as u32));
            }
        }
        match (self.input_height, self.input_width) {
            (Some(h), Some(w)) => Some((h as u32, w as u32)),
            _ => None,
        }
    }

    /// Access the complete merged map, including modeled keys.
    pub fn raw(&self) -> &RawConfig {
        &self.raw
    }

    /// Plain-text dump of the resolved config: one `key: value` line per
    /// sorted key. Written next to checkpoints for reproducibility.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for (key, value) in &self.raw {
            out.push_str(key);
            out.push_str(": ");
            out.push_str(&value.to_string());
            out.push('\n');
        }
        out
    }
}
