// LinearClassifier — softmax regression over time-averaged frame features
//
// The built-in baseline: enough model to exercise the whole pipeline
// (providers, epoch loop, checkpointing, evaluation) without an external
// NN framework. Sequences are averaged over the time axis before the
// linear map.

use std::fs;
use std::path::Path;

use ndarray::{Array1, Array2, ArrayView1, Axis};

use stoat_config::ExperimentConfig;
use stoat_data::Batch;

use crate::model::{Model, StepMetrics};
use crate::{Error, Result};

const MAGIC: &[u8; 4] = b"STL1";

pub struct LinearClassifier {
    /// Weights, `[input_dim, n_classes]`.
    w: Array2<f64>,
    /// Bias, `[n_classes]`.
    b: Array1<f64>,
    lr: f64,
    input_dim: usize,
    n_classes: usize,
}

impl LinearClassifier {
    /// Zero-initialized classifier. Zero init is exact for softmax
    /// regression (the loss is convex), so runs are deterministic.
    pub fn new(input_dim: usize, n_classes: usize, lr: f64) -> Self {
        LinearClassifier {
            w: Array2::zeros((input_dim, n_classes)),
            b: Array1::zeros(n_classes),
            lr,
            input_dim,
            n_classes,
        }
    }

    /// Build from a resolved config and the provider's per-sample shape
    /// (`[T, C, H, W]` or `[C, H, W]`).
    pub fn from_config(
        cfg: &ExperimentConfig,
        data_shape: &[usize],
        n_classes: usize,
    ) -> Result<Box<dyn Model>> {
        let input_dim = frame_dim(data_shape);
        let lr = cfg
            .extra
            .get("learning_rate")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.01);
        Ok(Box::new(LinearClassifier::new(input_dim, n_classes, lr)))
    }

    /// Batch inputs as an `[n, input_dim]` matrix, averaged over time.
    fn features(&self, batch: &Batch) -> Result<Array2<f64>> {
        let n = batch.len;
        if n == 0 {
            return Ok(Array2::zeros((0, self.input_dim)));
        }
        let sample_len = batch.inputs.len() / n;
        if sample_len == 0 || sample_len % self.input_dim != 0 {
            return Err(Error::Model(format!(
                "batch sample size {sample_len} does not match model input dim {}",
                self.input_dim
            )));
        }
        let t = sample_len / self.input_dim;

        let mut x = Array2::zeros((n, self.input_dim));
        for i in 0..n {
            for frame in 0..t {
                let off = i * sample_len + frame * self.input_dim;
                for j in 0..self.input_dim {
                    x[[i, j]] += batch.inputs[off + j];
                }
            }
        }
        x.mapv_inplace(|v| v / t as f64);
        Ok(x)
    }

    fn targets(&self, batch: &Batch) -> Result<Array2<f64>> {
        Array2::from_shape_vec((batch.len, self.n_classes), batch.targets.clone()).map_err(|_| {
            Error::Model(format!(
                "batch targets have shape {:?}, expected [{}, {}] one-hot labels",
                batch.target_shape, batch.len, self.n_classes
            ))
        })
    }

    /// Row-softmax of `x·W + b`.
    fn probs(&self, x: &Array2<f64>) -> Array2<f64> {
        let mut logits = x.dot(&self.w) + &self.b;
        for mut row in logits.rows_mut() {
            let max = row.fold(f64::NEG_INFINITY, |m, &v| m.max(v));
            row.mapv_inplace(|v| (v - max).exp());
            let sum = row.sum();
            row.mapv_inplace(|v| v / sum);
        }
        logits
    }
}

fn frame_dim(shape: &[usize]) -> usize {
    // leading dim of a rank-4 shape is time
    if shape.len() == 4 {
        shape[1..].iter().product()
    } else {
        shape.iter().product()
    }
}

fn argmax(row: ArrayView1<'_, f64>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

fn step_metrics(probs: &Array2<f64>, targets: &Array2<f64>) -> StepMetrics {
    let n = probs.nrows();
    if n == 0 {
        return StepMetrics::default();
    }
    let mut loss = 0.0;
    let mut correct = 0usize;
    for (p, t) in probs.rows().into_iter().zip(targets.rows()) {
        let truth = argmax(t);
        loss -= (p[truth] + 1e-12).ln();
        if argmax(p) == truth {
            correct += 1;
        }
    }
    StepMetrics {
        loss: loss / n as f64,
        accuracy: correct as f64 / n as f64,
    }
}

impl Model for LinearClassifier {
    fn train_batch(&mut self, batch: &Batch) -> Result<StepMetrics> {
        let x = self.features(batch)?;
        let y = self.targets(batch)?;
        let probs = self.probs(&x);
        let metrics = step_metrics(&probs, &y);

        // Gradient step: d(loss)/d(logits) = probs - y, averaged over the
        // batch.
        let grad = (&probs - &y) / batch.len.max(1) as f64;
        let dw = x.t().dot(&grad);
        let db = grad.sum_axis(Axis(0));
        self.w = &self.w - &(dw * self.lr);
        self.b = &self.b - &(db * self.lr);

        Ok(metrics)
    }

    fn eval_batch(&self, batch: &Batch) -> Result<StepMetrics> {
        let x = self.features(batch)?;
        let y = self.targets(batch)?;
        Ok(step_metrics(&self.probs(&x), &y))
    }

    fn save(&self, path: &Path) -> Result<()> {
        let mut buf =
            Vec::with_capacity(4 + 16 + 8 * (self.w.len() + self.b.len()));
        buf.extend_from_slice(MAGIC);
        buf.extend_from_slice(&(self.input_dim as u64).to_le_bytes());
        buf.extend_from_slice(&(self.n_classes as u64).to_le_bytes());
        for v in self.w.iter() {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in self.b.iter() {
            buf.extend_from_slice(&v.to_le_bytes());
        }
        fs::write(path, buf)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        let data = fs::read(path)?;
        let bad = |reason: &str| {
            Error::Model(format!("{}: {reason}", path.display()))
        };
        if data.len() < 20 || &data[0..4] != MAGIC {
            return Err(bad("not a linear checkpoint"));
        }
        let d = read_u64(&data[4..12]) as usize;
        let k = read_u64(&data[12..20]) as usize;
        if d != self.input_dim || k != self.n_classes {
            return Err(bad(&format!(
                "checkpoint dims [{d}, {k}] do not match model [{}, {}]",
                self.input_dim, self.n_classes
            )));
        }
        let expected = 20 + 8 * (d * k + k);
        if data.len() != expected {
            return Err(bad("truncated checkpoint"));
        }

        let mut values = data[20..]
            .chunks_exact(8)
            .map(|c| f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]));
        let w: Vec<f64> = values.by_ref().take(d * k).collect();
        let b: Vec<f64> = values.collect();
        self.w = Array2::from_shape_vec((d, k), w).map_err(|_| bad("bad weight block"))?;
        self.b = Array1::from_vec(b);
        Ok(())
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    u64::from_le_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}
