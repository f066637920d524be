//! # stoat-config
//!
//! Experiment configuration for stoat.
//!
//! This crate provides:
//! - [`ConfigValue`] — tagged union for heterogeneous config parameters
//! - [`Task`] — named classification problems and their class sets
//! - [`Registry`] — layered merging of base defaults, per-experiment
//!   overrides, and task-derived fields into resolved configs
//! - [`ExperimentConfig`] — the strongly-typed view of a resolved config,
//!   with a residual open map for unmodeled keys
//! - [`experiments::builtin`] — the static registration list of built-in
//!   experiments
//!
//! Configs are built once at process start and read-only thereafter; every
//! failure here is fatal and happens before any training starts.

pub mod error;
pub mod experiment;
pub mod experiments;
pub mod registry;
pub mod task;
pub mod value;

pub use error::{ConfigError, Result};
pub use experiment::{ExperimentConfig, RawConfig};
pub use registry::Registry;
pub use task::{builtin_tasks, Task};
pub use value::ConfigValue;
