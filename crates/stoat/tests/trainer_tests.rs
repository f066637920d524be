// Driver tests: a registered experiment trained end to end against a tiny
// on-disk tree, plus the skip and fail-fast paths.

use std::path::Path;

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use stoat::{evaluate, train, Error, ModelRegistry};
use stoat_config::{ConfigError, ConfigValue, RawConfig, Registry};

/// Two-class tree matching the `2c_easy` task: all `cooking` frames are
/// dark, all `walking` frames bright, so even the linear baseline can
/// separate them.
fn two_class_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    for (class, value) in [("cooking", 30u8), ("walking", 220u8)] {
        let class_dir = dir.path().join(class);
        std::fs::create_dir(&class_dir).unwrap();
        for i in 0..8 {
            RgbImage::from_pixel(1, 1, Rgb([value, value, value]))
                .save(class_dir.join(format!("ex_{i:03}.png")))
                .unwrap();
        }
    }
    dir
}

fn raw(pairs: &[(&str, ConfigValue)]) -> RawConfig {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn experiment(data_dir: &Path, results_dir: &Path, extra: &[(&str, ConfigValue)]) -> Registry {
    let mut base = raw(&[
        ("task", "2c_easy".into()),
        ("model_type", "linear".into()),
        ("epochs", 5usize.into()),
        ("batch_size", 4usize.into()),
        ("rescale", (1.0 / 255.0).into()),
        ("learning_rate", 0.5.into()),
        (
            "training_data_dir",
            data_dir.display().to_string().as_str().into(),
        ),
        (
            "base_results_dir",
            results_dir.display().to_string().as_str().into(),
        ),
    ]);
    base.extend(raw(extra));

    let mut registry = Registry::new();
    registry.register("exp", base, None).unwrap();
    registry
}

#[test]
fn trains_logs_and_checkpoints() {
    let tree = two_class_tree();
    let results = TempDir::new().unwrap();
    let registry = experiment(tree.path(), results.path(), &[]);
    let cfg = registry.get("exp").unwrap();

    let outcome = train(cfg, &ModelRegistry::with_defaults())
        .unwrap()
        .expect("non-empty split trains");

    assert!(!outcome.epochs.is_empty());
    let first = outcome.epochs.first().unwrap();
    let last = outcome.epochs.last().unwrap();
    assert!(last.loss < first.loss);

    let exp_dir = results.path().join("exp");
    assert!(exp_dir.join("experiment_config.txt").is_file());
    assert!(exp_dir.join("linear.ckpt").is_file());

    let log = std::fs::read_to_string(exp_dir.join("linear.log")).unwrap();
    let mut lines = log.lines();
    assert_eq!(lines.next(), Some("epoch,loss,accuracy,val_loss,val_accuracy"));
    assert_eq!(lines.count(), outcome.epochs.len());

    // the dump records the full resolved config
    let dump = std::fs::read_to_string(exp_dir.join("experiment_config.txt")).unwrap();
    assert!(dump.contains("task: 2c_easy\n"));
    assert!(dump.contains("classes: [cooking, walking]\n"));
}

#[test]
fn evaluates_against_the_checkpoint() {
    let tree = two_class_tree();
    let results = TempDir::new().unwrap();
    let registry = experiment(tree.path(), results.path(), &[]);
    let cfg = registry.get("exp").unwrap();
    let models = ModelRegistry::with_defaults();

    train(cfg, &models).unwrap().expect("trains");
    let (loss, accuracy) = evaluate(cfg, &models).unwrap().expect("test split non-empty");

    assert!(loss.is_finite());
    assert!(accuracy > 0.9, "separable classes should evaluate cleanly, got {accuracy}");
    let summary =
        std::fs::read_to_string(results.path().join("exp").join("test.txt")).unwrap();
    assert!(summary.contains("accuracy:"));
}

#[test]
fn empty_training_slice_skips_the_run() {
    let tree = two_class_tree();
    let results = TempDir::new().unwrap();
    let registry = experiment(
        tree.path(),
        results.path(),
        &[("training_index_start", 100.0.into())],
    );
    let cfg = registry.get("exp").unwrap();

    let outcome = train(cfg, &ModelRegistry::with_defaults()).unwrap();
    assert!(outcome.is_none());
}

#[test]
fn early_stopping_on_stalled_loss() {
    let tree = two_class_tree();
    let results = TempDir::new().unwrap();
    // learning rate zero: the loss never improves after the first epoch
    let registry = experiment(
        tree.path(),
        results.path(),
        &[
            ("learning_rate", 0.0.into()),
            ("epochs", 50usize.into()),
            ("stopping_patience", 1usize.into()),
        ],
    );
    let cfg = registry.get("exp").unwrap();

    let outcome = train(cfg, &ModelRegistry::with_defaults())
        .unwrap()
        .expect("trains");
    assert!(outcome.stopped_early);
    assert_eq!(outcome.epochs.len(), 2);
}

#[test]
fn unknown_model_type_fails_before_training() {
    let tree = two_class_tree();
    let results = TempDir::new().unwrap();
    let registry = experiment(
        tree.path(),
        results.path(),
        &[("model_type", "transformer".into())],
    );
    let cfg = registry.get("exp").unwrap();

    let err = train(cfg, &ModelRegistry::with_defaults()).unwrap_err();
    assert!(matches!(err, Error::Config(ConfigError::UnknownModel(_))));
}

#[test]
fn unregistered_builder_fails_fast() {
    let tree = two_class_tree();
    let results = TempDir::new().unwrap();
    let registry = experiment(
        tree.path(),
        results.path(),
        &[("model_type", "convlstm".into())],
    );
    let cfg = registry.get("exp").unwrap();

    // empty model registry: the tag parses but has no builder
    let err = train(cfg, &ModelRegistry::new()).unwrap_err();
    assert!(matches!(err, Error::Model(_)));
}
