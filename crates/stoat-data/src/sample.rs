// Sample and Batch — flattened tensors with explicit shapes

/// A single example: input features plus target, both flattened with their
/// shapes carried alongside so they can be stacked into batch tensors by
/// whatever framework consumes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    /// Input data (flattened). `[C, H, W]` in single-frame mode,
    /// `[T, C, H, W]` in sequence mode.
    pub features: Vec<f64>,
    pub feature_shape: Vec<usize>,
    /// Target: a one-hot class vector, or the features themselves in
    /// reconstruction mode.
    pub target: Vec<f64>,
    pub target_shape: Vec<usize>,
}

/// A fixed-size group of samples stacked along a leading batch dimension.
///
/// The last batch of an epoch may be smaller than the configured batch
/// size; `len` is the actual sample count.
#[derive(Debug, Clone)]
pub struct Batch {
    pub len: usize,
    pub inputs: Vec<f64>,
    /// `[len, ...feature_shape]`
    pub input_shape: Vec<usize>,
    pub targets: Vec<f64>,
    /// `[len, ...target_shape]`
    pub target_shape: Vec<usize>,
}

impl Batch {
    /// Stack samples into a batch. All samples must share feature and
    /// target shapes; the caller validates that before collating.
    pub(crate) fn collate(samples: Vec<Sample>) -> Batch {
        let len = samples.len();
        if len == 0 {
            return Batch {
                len: 0,
                inputs: Vec::new(),
                input_shape: vec![0],
                targets: Vec::new(),
                target_shape: vec![0],
            };
        }

        let feat_shape = samples[0].feature_shape.clone();
        let tgt_shape = samples[0].target_shape.clone();

        let mut inputs = Vec::with_capacity(len * samples[0].features.len());
        let mut targets = Vec::with_capacity(len * samples[0].target.len());
        for s in &samples {
            inputs.extend_from_slice(&s.features);
            targets.extend_from_slice(&s.target);
        }

        let mut input_shape = vec![len];
        input_shape.extend_from_slice(&feat_shape);
        let mut target_shape = vec![len];
        target_shape.extend_from_slice(&tgt_shape);

        Batch {
            len,
            inputs,
            input_shape,
            targets,
            target_shape,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collate_stacks_along_batch_dim() {
        let s = |v: f64, t: f64| Sample {
            features: vec![v, v],
            feature_shape: vec![2],
            target: vec![t],
            target_shape: vec![1],
        };
        let b = Batch::collate(vec![s(1.0, 0.0), s(2.0, 1.0), s(3.0, 0.0)]);
        assert_eq!(b.len, 3);
        assert_eq!(b.input_shape, vec![3, 2]);
        assert_eq!(b.inputs, vec![1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        assert_eq!(b.target_shape, vec![3, 1]);
        assert_eq!(b.targets, vec![0.0, 1.0, 0.0]);
    }

    #[test]
    fn collate_empty() {
        let b = Batch::collate(Vec::new());
        assert_eq!(b.len, 0);
        assert!(b.inputs.is_empty());
    }
}
