//! # stoat-data
//!
//! Sequence data loading for stoat.
//!
//! Streams labeled frame-sequence batches from directory trees laid out as
//! one subdirectory per class:
//!
//! ```text
//!   root/
//!     walking/
//!       clip_001/          ← an example source: a directory of frames
//!         frame_000.png
//!         frame_001.png
//!       still_042.png      ← or a single-frame source
//!     running/
//!       ...
//! ```
//!
//! This crate provides:
//! - [`ProviderConfig`] — construction parameters (windowing, striding,
//!   per-class slicing, batching, shuffling)
//! - [`SequenceProvider`] — a bound provider producing index-addressable
//!   batches, once per epoch
//! - [`EpochIterator`] — prefetching iteration with background workers
//!
//! Directory scans happen once at bind time, not per batch. Class names
//! and example identifiers are ordered lexicographically so two binds of
//! the same tree with the same parameters yield identical batches.

pub mod frames;
pub mod prefetch;
pub mod provider;
pub mod sample;

pub use prefetch::EpochIterator;
pub use provider::{OutputMode, ProviderConfig, SequenceProvider};
pub use sample::{Batch, Sample};

use std::io;
use std::path::PathBuf;

/// Errors from binding or reading a sequence provider.
#[derive(Debug)]
pub enum ProviderError {
    /// The root path is not a directory.
    NotADirectory(String),
    /// An explicitly configured class has no matching subdirectory.
    MissingClass { class: String, root: String },
    /// Slicing yielded zero examples. Callers are expected to skip the
    /// affected split and continue, not abort the whole run.
    EmptyDataset(String),
    /// A source file could not be decoded. Always propagated — silently
    /// dropping examples would corrupt reported metrics.
    Decode { path: PathBuf, reason: String },
    /// Samples within one batch disagree on shape (unsized images without
    /// a target size, or mixed source kinds).
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
    /// I/O error during the bind-time directory scan.
    Io(io::Error),
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderError::NotADirectory(p) => write!(f, "not a directory: {p}"),
            ProviderError::MissingClass { class, root } => {
                write!(f, "class '{class}' has no subdirectory under {root}")
            }
            ProviderError::EmptyDataset(p) => {
                write!(f, "no examples after slicing in {p}")
            }
            ProviderError::Decode { path, reason } => {
                write!(f, "failed to decode {}: {reason}", path.display())
            }
            ProviderError::ShapeMismatch { expected, got } => {
                write!(f, "sample shape mismatch: expected {expected:?}, got {got:?}")
            }
            ProviderError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<io::Error> for ProviderError {
    fn from(e: io::Error) -> Self {
        ProviderError::Io(e)
    }
}

/// Convenience Result type used throughout stoat-data.
pub type Result<T> = std::result::Result<T, ProviderError>;
