// Training and evaluation driver
//
// Wires a resolved experiment config into data providers and a model, runs
// the epoch loop, and writes the per-experiment artifacts:
//
//   results/<experiment>/experiment_config.txt   resolved config dump
//   results/<experiment>/<model_type>.log        per-epoch CSV metrics
//   results/<experiment>/<model_type>.ckpt       best checkpoint so far
//   results/<experiment>/test.txt                evaluation summary
//
// A split that slices down to zero examples is skipped with a warning, not
// treated as a crash: sweeping experiment lists routinely produce empty
// combinations.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};

use stoat_config::{ConfigError, ExperimentConfig};
use stoat_data::{OutputMode, ProviderConfig, SequenceProvider};

use crate::model::{Model, ModelKind, ModelRegistry, StepMetrics};
use crate::utils::get_create_results_dir;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
enum Split {
    Training,
    Validation,
    Test,
}

/// Metrics for one completed epoch.
#[derive(Debug, Clone, Copy)]
pub struct EpochLog {
    pub epoch: usize,
    pub loss: f64,
    pub accuracy: f64,
    pub val_loss: Option<f64>,
    pub val_accuracy: Option<f64>,
}

/// Summary of a full training run.
#[derive(Debug, Clone)]
pub struct TrainOutcome {
    pub epochs: Vec<EpochLog>,
    /// Best monitored loss (validation loss when a validation split
    /// exists, training loss otherwise).
    pub best_loss: f64,
    pub stopped_early: bool,
    pub checkpoint: PathBuf,
}

impl fmt::Display for TrainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Training complete — {} epochs{}",
            self.epochs.len(),
            if self.stopped_early { " (stopped early)" } else { "" }
        )?;
        for log in &self.epochs {
            write!(f, "  epoch {}: loss = {:.6}, acc = {:.4}", log.epoch, log.loss, log.accuracy)?;
            if let (Some(vl), Some(va)) = (log.val_loss, log.val_accuracy) {
                write!(f, ", val_loss = {vl:.6}, val_acc = {va:.4}")?;
            }
            writeln!(f)?;
        }
        write!(f, "  best loss: {:.6} ({})", self.best_loss, self.checkpoint.display())
    }
}

fn output_mode(cfg: &ExperimentConfig) -> OutputMode {
    match cfg.output_mode.as_deref() {
        Some("reconstruct") | Some("error") => OutputMode::Reconstruct,
        _ => OutputMode::Classify,
    }
}

/// Provider parameters for one split of the experiment.
fn provider_config(cfg: &ExperimentConfig, split: Split) -> ProviderConfig {
    let (index_start, max_per_class) = match split {
        Split::Training => (cfg.training_index_start, cfg.training_max_per_class),
        Split::Validation => (cfg.validation_index_start, cfg.validation_max_per_class),
        Split::Test => (cfg.test_index_start, cfg.test_max_per_class),
    };
    ProviderConfig::default()
        .target_size(cfg.target_size())
        .seq_length(cfg.seq_length)
        .sample_step(cfg.sample_step)
        .seq_overlap(cfg.seq_overlap)
        .min_seq_length(cfg.min_seq_length)
        .pad_sequences(cfg.pad_sequences)
        .max_seq_per_source(cfg.max_seq_per_source)
        .batch_size(cfg.batch_size)
        .shuffle(matches!(split, Split::Training) && cfg.shuffle)
        .seed(cfg.seed)
        .rescale(cfg.rescale)
        .grayscale(cfg.input_channels == Some(1))
        .classes(cfg.classes.clone())
        .index_start(index_start)
        .max_per_class(max_per_class)
        .output_mode(output_mode(cfg))
        .workers(cfg.workers)
        .queue_size(cfg.max_queue_size)
}

fn require_dir<'a>(cfg: &ExperimentConfig, key: &str, dir: &'a Option<PathBuf>) -> Result<&'a Path> {
    dir.as_deref().ok_or_else(|| {
        Error::Config(ConfigError::MissingKey {
            experiment: cfg.name.clone(),
            key: key.to_string(),
        })
    })
}

/// Evaluate a model over every batch of a provider, sample-weighted.
fn run_eval(model: &dyn Model, provider: &SequenceProvider) -> Result<(f64, f64)> {
    let mut loss = 0.0;
    let mut acc = 0.0;
    let mut n = 0usize;
    for i in 0..provider.num_batches() {
        let batch = provider.get_batch(i)?;
        let m = model.eval_batch(&batch)?;
        loss += m.loss * batch.len as f64;
        acc += m.accuracy * batch.len as f64;
        n += batch.len;
    }
    let n = n.max(1) as f64;
    Ok((loss / n, acc / n))
}

/// Train a model for the given experiment.
///
/// Returns `Ok(None)` when the training split holds no examples after
/// slicing; the run is skipped with a warning so experiment sweeps keep
/// going.
pub fn train(cfg: &ExperimentConfig, models: &ModelRegistry) -> Result<Option<TrainOutcome>> {
    let train_dir = require_dir(cfg, "training_data_dir", &cfg.training_data_dir)?;
    let mut train_provider = provider_config(cfg, Split::Training).bind_to_directory(train_dir)?;
    if train_provider.num_batches() == 0 {
        warn!("{}: training split is empty after slicing, skipping run", cfg.name);
        return Ok(None);
    }

    // A validation split exists when a validation directory or slice is
    // configured; it reuses the training directory when only the slice is
    // given.
    let val_provider = if cfg.validation_data_dir.is_some()
        || cfg.validation_index_start.is_some()
        || cfg.validation_max_per_class.is_some()
    {
        let dir = cfg
            .validation_data_dir
            .as_deref()
            .unwrap_or(train_dir);
        let p = provider_config(cfg, Split::Validation).bind_to_directory(dir)?;
        if p.num_batches() == 0 {
            warn!("{}: validation split is empty after slicing, training without it", cfg.name);
            None
        } else {
            Some(p)
        }
    } else {
        None
    };

    let kind: ModelKind = cfg.model_type.parse().map_err(Error::Config)?;
    let data_shape = train_provider
        .data_shape()
        .map(|s| s.to_vec())
        .unwrap_or_default();
    let mut model = models.build(kind, cfg, &data_shape, train_provider.n_classes())?;

    let results_dir = get_create_results_dir(&cfg.base_results_dir, &cfg.name)?;
    save_experiment_config(cfg, &results_dir)?;
    let checkpoint = results_dir.join(format!("{}.ckpt", cfg.model_type));
    let mut csv = fs::File::create(results_dir.join(format!("{}.log", cfg.model_type)))?;
    writeln!(csv, "epoch,loss,accuracy,val_loss,val_accuracy")?;

    info!(
        "{}: training {} on {} examples ({} batches){}",
        cfg.name,
        cfg.model_type,
        train_provider.len(),
        train_provider.num_batches(),
        match &val_provider {
            Some(p) => format!(", validating on {}", p.len()),
            None => String::new(),
        }
    );

    let mut epochs = Vec::new();
    let mut best_loss = f64::INFINITY;
    let mut epochs_since_best = 0usize;
    let mut stopped_early = false;

    for epoch in 0..cfg.epochs {
        let mut loss_sum = 0.0;
        let mut acc_sum = 0.0;
        let mut seen = 0usize;
        for batch in train_provider.iter_epoch() {
            let batch = batch?;
            let m: StepMetrics = model.train_batch(&batch)?;
            loss_sum += m.loss * batch.len as f64;
            acc_sum += m.accuracy * batch.len as f64;
            seen += batch.len;
        }
        let seen = seen.max(1) as f64;
        let loss = loss_sum / seen;
        let accuracy = acc_sum / seen;

        let (val_loss, val_accuracy) = match &val_provider {
            Some(p) => {
                let (l, a) = run_eval(model.as_ref(), p)?;
                (Some(l), Some(a))
            }
            None => (None, None),
        };

        info!(
            "{}: epoch {}/{}: loss {loss:.4}, acc {accuracy:.4}{}",
            cfg.name,
            epoch + 1,
            cfg.epochs,
            match (val_loss, val_accuracy) {
                (Some(vl), Some(va)) => format!(", val_loss {vl:.4}, val_acc {va:.4}"),
                _ => String::new(),
            }
        );
        writeln!(
            csv,
            "{},{:.6},{:.6},{},{}",
            epoch,
            loss,
            accuracy,
            val_loss.map(|v| format!("{v:.6}")).unwrap_or_default(),
            val_accuracy.map(|v| format!("{v:.6}")).unwrap_or_default(),
        )?;
        epochs.push(EpochLog {
            epoch,
            loss,
            accuracy,
            val_loss,
            val_accuracy,
        });

        // Keep the checkpoint of the best epoch, monitored on validation
        // loss when available.
        let monitored = val_loss.unwrap_or(loss);
        if monitored < best_loss {
            best_loss = monitored;
            epochs_since_best = 0;
            model.save(&checkpoint)?;
        } else {
            epochs_since_best += 1;
            if let Some(patience) = cfg.stopping_patience {
                if epochs_since_best >= patience {
                    info!(
                        "{}: no improvement in {patience} epochs, stopping early",
                        cfg.name
                    );
                    stopped_early = true;
                    break;
                }
            }
        }
    }

    Ok(Some(TrainOutcome {
        epochs,
        best_loss,
        stopped_early,
        checkpoint,
    }))
}

/// Evaluate the experiment's model on the test split.
///
/// Loads the checkpoint written by [`train`] when one exists. Returns
/// `Ok(None)` when the test split holds no examples after slicing; writes
/// `test.txt` and returns (loss, accuracy) otherwise.
pub fn evaluate(cfg: &ExperimentConfig, models: &ModelRegistry) -> Result<Option<(f64, f64)>> {
    let test_dir = match (&cfg.test_data_dir, &cfg.training_data_dir) {
        (Some(d), _) | (None, Some(d)) => d.as_path(),
        (None, None) => {
            return Err(Error::Config(ConfigError::MissingKey {
                experiment: cfg.name.clone(),
                key: "test_data_dir".to_string(),
            }))
        }
    };
    let provider = provider_config(cfg, Split::Test).bind_to_directory(test_dir)?;
    if provider.num_batches() == 0 {
        warn!("{}: test split is empty after slicing, skipping evaluation", cfg.name);
        return Ok(None);
    }

    let kind: ModelKind = cfg.model_type.parse().map_err(Error::Config)?;
    let data_shape = provider.data_shape().map(|s| s.to_vec()).unwrap_or_default();
    let mut model = models.build(kind, cfg, &data_shape, provider.n_classes())?;

    let results_dir = get_create_results_dir(&cfg.base_results_dir, &cfg.name)?;
    let checkpoint = results_dir.join(format!("{}.ckpt", cfg.model_type));
    if checkpoint.is_file() {
        model.load(&checkpoint)?;
    }

    let (loss, accuracy) = run_eval(model.as_ref(), &provider)?;
    info!(
        "{}: test loss {loss:.4}, accuracy {accuracy:.4} over {} examples",
        cfg.name,
        provider.len()
    );
    fs::write(
        results_dir.join("test.txt"),
        format!("examples: {}\nloss: {loss:.6}\naccuracy: {accuracy:.6}\n", provider.len()),
    )?;
    Ok(Some((loss, accuracy)))
}

/// Persist the resolved configuration next to the run's artifacts, one
/// sorted `key: value` line per parameter.
pub fn save_experiment_config(cfg: &ExperimentConfig, results_dir: &Path) -> Result<()> {
    fs::write(results_dir.join("experiment_config.txt"), cfg.dump())?;
    Ok(())
}
