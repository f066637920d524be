// SequenceProvider — per-class slicing, temporal windowing, batching
//
// Binding walks the directory tree once:
//
//   1. Resolve the class list (explicit and validated, or inferred from
//      sorted subdirectory names).
//   2. Per class, list example sources in sorted order and slice them by
//      `index_start` / `max_per_class` (absolute counts, or per-class
//      fractions when the value is in [0, 1)).
//   3. Expand each surviving source into temporal windows and concatenate
//      everything into a flat example list — the epoch-0 iteration order.
//
// Batches are then addressable by index; `reshuffle` re-permutes the flat
// list once per epoch boundary, never mid-epoch.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, SeedableRng};
use rayon::prelude::*;

use crate::frames::{is_frame, load_frame};
use crate::prefetch::EpochIterator;
use crate::sample::{Batch, Sample};
use crate::{ProviderError, Result};

/// What the target half of each sample carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// One-hot label over the resolved class list.
    #[default]
    Classify,
    /// The frames themselves (self-supervised / PredNet-style training).
    Reconstruct,
}

/// Construction parameters for a [`SequenceProvider`].
///
/// All parameters are optional with the defaults below; the builder-style
/// setters mirror how configs hand their values over one by one.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Target spatial size (height, width); `None` keeps native frame size.
    pub target_size: Option<(u32, u32)>,
    /// Temporal window length; `None` means single-frame mode.
    pub seq_length: Option<usize>,
    /// Stride between sampled frames within a window.
    pub sample_step: usize,
    /// Sampled-frame overlap between consecutive windows of one source.
    pub seq_overlap: usize,
    /// Minimum usable sampled frames for a padded window.
    pub min_seq_length: Option<usize>,
    /// Zero-pad the tail of windows shorter than `seq_length`.
    pub pad_sequences: bool,
    /// Cap on windows drawn from a single source.
    pub max_seq_per_source: Option<usize>,
    pub batch_size: usize,
    /// Re-permute the example order once per epoch.
    pub shuffle: bool,
    /// Explicit shuffle seed; `None` uses a thread-local RNG.
    pub seed: Option<u64>,
    /// Multiplicative pixel rescale (e.g. `1.0 / 255.0`).
    pub rescale: Option<f64>,
    pub grayscale: bool,
    /// Explicit class list; `None` infers from subdirectories.
    pub classes: Option<Vec<String>>,
    /// Per-class slice offset: absolute count, or fraction in [0, 1).
    pub index_start: Option<f64>,
    /// Per-class slice cap: absolute count, or fraction in [0, 1).
    pub max_per_class: Option<f64>,
    pub output_mode: OutputMode,
    /// Worker threads for intra-batch parallel loading (0 = sequential).
    pub workers: usize,
    /// Prefetch depth for [`SequenceProvider::iter_epoch`].
    pub queue_size: usize,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            target_size: None,
            seq_length: None,
            sample_step: 1,
            seq_overlap: 0,
            min_seq_length: None,
            pad_sequences: false,
            max_seq_per_source: None,
            batch_size: 10,
            shuffle: false,
            seed: None,
            rescale: None,
            grayscale: false,
            classes: None,
            index_start: None,
            max_per_class: None,
            output_mode: OutputMode::Classify,
            workers: 0,
            queue_size: 10,
        }
    }
}

impl ProviderConfig {
    pub fn target_size(mut self, hw: Option<(u32, u32)>) -> Self {
        self.target_size = hw;
        self
    }
    pub fn seq_length(mut self, t: Option<usize>) -> Self {
        self.seq_length = t;
        self
    }
    pub fn sample_step(mut self, s: usize) -> Self {
        self.sample_step = s;
        self
    }
    pub fn seq_overlap(mut self, o: usize) -> Self {
        self.seq_overlap = o;
        self
    }
    pub fn min_seq_length(mut self, m: Option<usize>) -> Self {
        self.min_seq_length = m;
        self
    }
    pub fn pad_sequences(mut self, p: bool) -> Self {
        self.pad_sequences = p;
        self
    }
    pub fn max_seq_per_source(mut self, m: Option<usize>) -> Self {
        self.max_seq_per_source = m;
        self
    }
    pub fn batch_size(mut self, bs: usize) -> Self {
        self.batch_size = bs;
        self
    }
    pub fn shuffle(mut self, s: bool) -> Self {
        self.shuffle = s;
        self
    }
    pub fn seed(mut self, s: Option<u64>) -> Self {
        self.seed = s;
        self
    }
    pub fn rescale(mut self, r: Option<f64>) -> Self {
        self.rescale = r;
        self
    }
    pub fn grayscale(mut self, g: bool) -> Self {
        self.grayscale = g;
        self
    }
    pub fn classes(mut self, cs: Option<Vec<String>>) -> Self {
        self.classes = cs;
        self
    }
    pub fn index_start(mut self, v: Option<f64>) -> Self {
        self.index_start = v;
        self
    }
    pub fn max_per_class(mut self, v: Option<f64>) -> Self {
        self.max_per_class = v;
        self
    }
    pub fn output_mode(mut self, m: OutputMode) -> Self {
        self.output_mode = m;
        self
    }
    pub fn workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }
    pub fn queue_size(mut self, n: usize) -> Self {
        self.queue_size = n;
        self
    }

    /// Scan `root` and build a bound provider.
    ///
    /// The scan happens once, here; batch production later never touches
    /// the directory structure again.
    pub fn bind_to_directory(&self, root: impl AsRef<Path>) -> Result<SequenceProvider> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ProviderError::NotADirectory(root.display().to_string()));
        }

        let on_disk = list_class_dirs(root)?;
        let class_names: Vec<String> = match &self.classes {
            Some(wanted) => {
                for class in wanted {
                    if !on_disk.iter().any(|c| c == class) {
                        return Err(ProviderError::MissingClass {
                            class: class.clone(),
                            root: root.display().to_string(),
                        });
                    }
                }
                wanted.clone()
            }
            None => on_disk,
        };

        let mut examples = Vec::new();
        for (class_idx, class) in class_names.iter().enumerate() {
            let sources = list_sources(&root.join(class))?;
            let (start, end) = slice_bounds(sources.len(), self.index_start, self.max_per_class);
            // An empty slice means this class contributes zero examples —
            // by design, not an error.
            for source in &sources[start..end] {
                for window_start in expand_windows(
                    source.len(),
                    self.seq_length,
                    self.sample_step,
                    self.seq_overlap,
                    self.min_seq_length,
                    self.pad_sequences,
                    self.max_seq_per_source,
                ) {
                    examples.push(Example {
                        class: class_idx,
                        frames: source.clone(),
                        start: window_start,
                    });
                }
            }
        }

        // One decode up front to learn the fixed data shape.
        let data_shape = match examples.first() {
            Some(ex) => {
                let (_, [c, h, w]) = load_frame(
                    &ex.frames[ex.start],
                    self.target_size,
                    self.grayscale,
                    self.rescale,
                )?;
                Some(match self.seq_length {
                    Some(t) => vec![t, c, h, w],
                    None => vec![c, h, w],
                })
            }
            None => None,
        };

        let order: Vec<usize> = (0..examples.len()).collect();
        let rng = self.seed.map(StdRng::seed_from_u64);

        // A zero batch size would divide by zero in num_batches.
        let mut config = self.clone();
        config.batch_size = config.batch_size.max(1);

        Ok(SequenceProvider {
            config,
            root: root.to_path_buf(),
            class_names: Arc::new(class_names),
            examples: Arc::new(examples),
            order,
            rng,
            data_shape,
        })
    }
}

/// One example: a temporal window into a source's frame list.
#[derive(Debug, Clone)]
pub(crate) struct Example {
    pub(crate) class: usize,
    pub(crate) frames: Arc<Vec<PathBuf>>,
    pub(crate) start: usize,
}

/// A provider bound to a directory tree, producing index-addressable
/// batches of (sequence, label) pairs.
#[derive(Debug)]
pub struct SequenceProvider {
    pub(crate) config: ProviderConfig,
    root: PathBuf,
    pub(crate) class_names: Arc<Vec<String>>,
    pub(crate) examples: Arc<Vec<Example>>,
    pub(crate) order: Vec<usize>,
    rng: Option<StdRng>,
    data_shape: Option<Vec<usize>>,
}

impl SequenceProvider {
    /// Total example count after slicing and window expansion.
    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Batches per epoch: `ceil(total / batch_size)`.
    ///
    /// Zero signals "insufficient data" — the caller must treat that as a
    /// hard stop for this split, not silently continue.
    pub fn num_batches(&self) -> usize {
        self.examples.len().div_ceil(self.config.batch_size)
    }

    /// Resolved class names, in label order.
    pub fn class_names(&self) -> &[String] {
        &self.class_names
    }

    pub fn n_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Shape of one sample's input (`[T, C, H, W]` or `[C, H, W]`), or
    /// `None` when the provider holds no examples.
    pub fn data_shape(&self) -> Option<&[usize]> {
        self.data_shape.as_deref()
    }

    /// Hard error when slicing yielded zero examples.
    pub fn ensure_non_empty(&self) -> Result<()> {
        if self.examples.is_empty() {
            return Err(ProviderError::EmptyDataset(self.root.display().to_string()));
        }
        Ok(())
    }

    /// Re-permute the example order. Call at epoch boundaries only; order
    /// is stable within an epoch.
    pub fn reshuffle(&mut self) {
        if !self.config.shuffle {
            return;
        }
        match &mut self.rng {
            Some(rng) => self.order.shuffle(rng),
            None => self.order.shuffle(&mut thread_rng()),
        }
    }

    /// Produce batch `i` of the current epoch order.
    ///
    /// # Panics
    /// Panics if `i >= num_batches()`.
    pub fn get_batch(&self, i: usize) -> Result<Batch> {
        let bs = self.config.batch_size;
        let start = i * bs;
        assert!(
            start < self.examples.len(),
            "batch index {i} out of range ({} batches)",
            self.num_batches()
        );
        let end = (start + bs).min(self.examples.len());
        let indices: Vec<usize> = self.order[start..end].to_vec();
        load_batch(&self.config, &self.class_names, &self.examples, &indices)
    }

    /// Iterate one epoch with background prefetching.
    ///
    /// Reshuffles (if configured), then spawns workers that pull batch
    /// indices off a shared queue — each index is consumed by exactly one
    /// worker — and yields batches to the caller in index order.
    pub fn iter_epoch(&mut self) -> EpochIterator {
        self.reshuffle();
        EpochIterator::spawn(self)
    }
}

// Scanning helpers

/// Subdirectory names of `root`, sorted lexicographically.
fn list_class_dirs(root: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Example sources of one class directory, sorted lexicographically.
///
/// A source is either a single frame file or a subdirectory holding a
/// frame sequence (its frames again deterministically sorted).
fn list_sources(class_dir: &Path) -> Result<Vec<Arc<Vec<PathBuf>>>> {
    let mut entries: Vec<PathBuf> = std::fs::read_dir(class_dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();

    let mut sources = Vec::new();
    for path in entries {
        if path.is_dir() {
            let mut frames: Vec<PathBuf> = std::fs::read_dir(&path)?
                .collect::<std::io::Result<Vec<_>>>()?
                .into_iter()
                .map(|e| e.path())
                .filter(|p| p.is_file() && is_frame(p))
                .collect();
            frames.sort();
            sources.push(Arc::new(frames));
        } else if is_frame(&path) {
            sources.push(Arc::new(vec![path]));
        }
    }
    Ok(sources)
}

// Slicing and windowing

/// Resolve a per-class slice bound: values in [0, 1) are fractions of
/// `count` (rounded), anything else is an absolute count.
fn resolve_bound(v: f64, count: usize) -> usize {
    if (0.0..1.0).contains(&v) {
        (v * count as f64).round() as usize
    } else {
        v as usize
    }
}

/// Compute the `[start, end)` source slice for one class of `count`
/// sources. Bounds are resolved independently per class so splits stay
/// proportional when class sizes differ.
pub(crate) fn slice_bounds(
    count: usize,
    index_start: Option<f64>,
    max_per_class: Option<f64>,
) -> (usize, usize) {
    let start = index_start
        .map(|v| resolve_bound(v, count))
        .unwrap_or(0)
        .min(count);
    let end = match max_per_class {
        Some(v) => (start + resolve_bound(v, count)).min(count),
        None => count,
    };
    (start, end)
}

/// Window start offsets (raw frame indices) for a source of `n_frames`.
///
/// Sequence mode gathers `seq_length` frames at offsets advancing by
/// `sample_step`; consecutive windows advance by
/// `(seq_length - seq_overlap) * sample_step` raw frames. A tail window
/// shorter than `seq_length` is emitted only when `pad_sequences` is set
/// and at least `min_seq_length` (default 1) sampled frames remain.
///
/// Single-frame mode (`seq_length == None`) yields every `sample_step`-th
/// frame as its own example.
pub(crate) fn expand_windows(
    n_frames: usize,
    seq_length: Option<usize>,
    sample_step: usize,
    seq_overlap: usize,
    min_seq_length: Option<usize>,
    pad_sequences: bool,
    max_seq_per_source: Option<usize>,
) -> Vec<usize> {
    let step = sample_step.max(1);
    let cap = max_seq_per_source.unwrap_or(usize::MAX);
    let mut starts = Vec::new();

    let Some(t) = seq_length else {
        let mut s = 0;
        while s < n_frames && starts.len() < cap {
            starts.push(s);
            s += step;
        }
        return starts;
    };

    let advance = (t.saturating_sub(seq_overlap)).max(1) * step;
    let pad_min = min_seq_length.unwrap_or(1).max(1);

    let mut s = 0;
    while s < n_frames && starts.len() < cap {
        // Sampled frames available from this start.
        let avail = (n_frames - s).div_ceil(step);
        if avail >= t {
            starts.push(s);
        } else if pad_sequences && avail >= pad_min {
            // One padded tail window; anything after it would only be
            // more padded.
            starts.push(s);
            break;
        } else {
            break;
        }
        s += advance;
    }
    starts
}

// Batch loading

/// Load one batch worth of examples, optionally in parallel via rayon.
///
/// A free function so prefetch workers can call it against shared
/// `Arc`-held state without borrowing the provider.
pub(crate) fn load_batch(
    config: &ProviderConfig,
    class_names: &[String],
    examples: &[Example],
    indices: &[usize],
) -> Result<Batch> {
    let samples: Vec<Sample> = if config.workers > 0 && indices.len() > 1 {
        indices
            .par_iter()
            .map(|&i| load_example(config, class_names.len(), &examples[i]))
            .collect::<Result<Vec<_>>>()?
    } else {
        indices
            .iter()
            .map(|&i| load_example(config, class_names.len(), &examples[i]))
            .collect::<Result<Vec<_>>>()?
    };

    if let Some(first) = samples.first() {
        for s in &samples[1..] {
            if s.feature_shape != first.feature_shape {
                return Err(ProviderError::ShapeMismatch {
                    expected: first.feature_shape.clone(),
                    got: s.feature_shape.clone(),
                });
            }
        }
    }

    Ok(Batch::collate(samples))
}

/// Load a single example: its window of frames plus its target.
fn load_example(config: &ProviderConfig, n_classes: usize, ex: &Example) -> Result<Sample> {
    let window_len = config.seq_length.unwrap_or(1);
    let step = config.sample_step.max(1);

    // Window starts always point at a real frame; padding only ever
    // happens at the tail.
    let (first, frame_shape) = load_frame(
        &ex.frames[ex.start],
        config.target_size,
        config.grayscale,
        config.rescale,
    )?;
    let frame_len = first.len();
    let mut features = first;

    for k in 1..window_len {
        let idx = ex.start + k * step;
        if idx < ex.frames.len() {
            let (data, shape) = load_frame(
                &ex.frames[idx],
                config.target_size,
                config.grayscale,
                config.rescale,
            )?;
            if shape != frame_shape {
                return Err(ProviderError::ShapeMismatch {
                    expected: frame_shape.to_vec(),
                    got: shape.to_vec(),
                });
            }
            features.extend_from_slice(&data);
        } else {
            features.extend(std::iter::repeat(0.0).take(frame_len));
        }
    }

    let [c, h, w] = frame_shape;
    let feature_shape = match config.seq_length {
        Some(t) => vec![t, c, h, w],
        None => vec![c, h, w],
    };

    let (target, target_shape) = match config.output_mode {
        OutputMode::Classify => {
            let mut one_hot = vec![0.0; n_classes];
            one_hot[ex.class] = 1.0;
            (one_hot, vec![n_classes])
        }
        OutputMode::Reconstruct => (features.clone(), feature_shape.clone()),
    };

    Ok(Sample {
        features,
        feature_shape,
        target,
        target_shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_bounds_resolve_per_class() {
        // N=10, start=0.5, cap=0.2 → round(5), round(2) → [5, 7)
        assert_eq!(slice_bounds(10, Some(0.5), Some(0.2)), (5, 7));
        // Different class size, same fractions → different absolutes
        assert_eq!(slice_bounds(30, Some(0.5), Some(0.2)), (15, 21));
    }

    #[test]
    fn absolute_bounds() {
        assert_eq!(slice_bounds(10, Some(3.0), Some(4.0)), (3, 7));
        // 1.0 is outside [0, 1): an absolute count, not "100%"
        assert_eq!(slice_bounds(10, Some(1.0), None), (1, 10));
    }

    #[test]
    fn bounds_clip_to_available() {
        assert_eq!(slice_bounds(10, Some(8.0), Some(5.0)), (8, 10));
        assert_eq!(slice_bounds(10, Some(20.0), Some(5.0)), (10, 10));
        assert_eq!(slice_bounds(0, Some(0.5), Some(0.5)), (0, 0));
    }

    #[test]
    fn no_bounds_take_everything() {
        assert_eq!(slice_bounds(13, None, None), (0, 13));
    }

    #[test]
    fn windows_full_only_without_padding() {
        // 6 frames, want 5 sampled at stride 2 → only 3 available
        assert_eq!(
            expand_windows(6, Some(5), 2, 0, None, false, None),
            Vec::<usize>::new()
        );
    }

    #[test]
    fn windows_padded_tail() {
        // offsets [0, 2, 4] real, remaining two sampled slots padded
        assert_eq!(expand_windows(6, Some(5), 2, 0, None, true, None), vec![0]);
    }

    #[test]
    fn windows_advance_with_overlap() {
        // advance = (3 - 1) * 1 = 2 frames between windows
        assert_eq!(
            expand_windows(12, Some(3), 1, 1, None, false, None),
            vec![0, 2, 4, 6, 8]
        );
    }

    #[test]
    fn windows_capped_per_source() {
        assert_eq!(
            expand_windows(10, Some(3), 1, 0, None, false, Some(2)),
            vec![0, 3]
        );
    }

    #[test]
    fn windows_min_seq_length_gate() {
        // 3 available < min 4 → source dropped
        assert_eq!(
            expand_windows(3, Some(5), 1, 0, Some(4), true, None),
            Vec::<usize>::new()
        );
        // 3 available >= min 2 → padded window survives
        assert_eq!(expand_windows(3, Some(5), 1, 0, Some(2), true, None), vec![0]);
    }

    #[test]
    fn single_frame_mode_strides_frames() {
        assert_eq!(expand_windows(7, None, 3, 0, None, false, None), vec![0, 3, 6]);
        assert_eq!(expand_windows(0, None, 1, 0, None, false, None), Vec::<usize>::new());
    }
}
