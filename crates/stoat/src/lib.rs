//! # stoat
//!
//! Training and evaluation harness for video-activity classifiers.
//!
//! The harness wires the other two crates together:
//!
//! - `stoat-config` resolves a named experiment into an
//!   [`ExperimentConfig`](stoat_config::ExperimentConfig);
//! - `stoat-data` streams labeled frame-sequence batches from the
//!   experiment's directory trees;
//! - this crate turns the config's `model_type` tag into a [`Model`],
//!   runs the epoch loop with CSV metrics logging, best-checkpoint
//!   saving, and early stopping, and evaluates on the test split.
//!
//! Real topologies plug in through the [`Model`] trait and
//! [`ModelRegistry`]; a softmax [`linear::LinearClassifier`] baseline is
//! built in so the whole pipeline runs end to end without an external
//! framework.

pub mod linear;
pub mod model;
pub mod trainer;
pub mod utils;

pub use model::{Model, ModelBuilder, ModelKind, ModelRegistry, StepMetrics};
pub use trainer::{evaluate, save_experiment_config, train, EpochLog, TrainOutcome};

use std::io;

/// Top-level harness error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] stoat_config::ConfigError),
    #[error(transparent)]
    Data(#[from] stoat_data::ProviderError),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("model error: {0}")]
    Model(String),
}

pub type Result<T> = std::result::Result<T, Error>;
