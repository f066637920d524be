// Model seam — the trait trained models implement, plus the tag/builder
// registry that resolves a config's `model_type` string at startup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use stoat_config::{ConfigError, ExperimentConfig};
use stoat_data::Batch;

use crate::linear::LinearClassifier;
use crate::{Error, Result};

/// Loss and accuracy from one batch step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepMetrics {
    pub loss: f64,
    pub accuracy: f64,
}

/// Anything the driver can train and evaluate.
///
/// Heavy topologies (ConvLSTM, PredNet, pretrained VGG streams) live in
/// external frameworks and plug in through this trait; the harness itself
/// only ships the [`LinearClassifier`] baseline. Checkpoint contents are
/// opaque to the driver.
pub trait Model {
    fn train_batch(&mut self, batch: &Batch) -> Result<StepMetrics>;
    fn eval_batch(&self, batch: &Batch) -> Result<StepMetrics>;
    fn save(&self, path: &Path) -> Result<()>;
    fn load(&mut self, path: &Path) -> Result<()>;
}

/// Recognized model topology tags.
///
/// Parsed from the config's `model_type` string once, up front, so a typo
/// fails before any data is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ModelKind {
    Convnet,
    Lstm,
    ConvLstm,
    Multistream,
    VggImagenet,
    Linear,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Convnet => "convnet",
            ModelKind::Lstm => "lstm",
            ModelKind::ConvLstm => "convlstm",
            ModelKind::Multistream => "multistream",
            ModelKind::VggImagenet => "vgg_imagenet",
            ModelKind::Linear => "linear",
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "convnet" => Ok(ModelKind::Convnet),
            "lstm" => Ok(ModelKind::Lstm),
            "convlstm" => Ok(ModelKind::ConvLstm),
            "multistream" => Ok(ModelKind::Multistream),
            "vgg_imagenet" => Ok(ModelKind::VggImagenet),
            "linear" => Ok(ModelKind::Linear),
            other => Err(ConfigError::UnknownModel(other.to_string())),
        }
    }
}

/// Builds a model from the resolved config, the provider's per-sample data
/// shape, and the class count.
pub type ModelBuilder =
    Box<dyn Fn(&ExperimentConfig, &[usize], usize) -> Result<Box<dyn Model>> + Send + Sync>;

/// Builders keyed by [`ModelKind`], resolved once at startup.
///
/// Building an unregistered kind fails fast; there is no fallback model.
#[derive(Default)]
pub struct ModelRegistry {
    builders: BTreeMap<ModelKind, ModelBuilder>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in baseline registered.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        reg.register(
            ModelKind::Linear,
            Box::new(|cfg, shape, n_classes| LinearClassifier::from_config(cfg, shape, n_classes)),
        );
        reg
    }

    pub fn register(&mut self, kind: ModelKind, builder: ModelBuilder) {
        self.builders.insert(kind, builder);
    }

    pub fn build(
        &self,
        kind: ModelKind,
        cfg: &ExperimentConfig,
        data_shape: &[usize],
        n_classes: usize,
    ) -> Result<Box<dyn Model>> {
        let builder = self.builders.get(&kind).ok_or_else(|| {
            Error::Model(format!("no model builder registered for '{kind}'"))
        })?;
        builder(cfg, data_shape, n_classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_kind_round_trip() {
        for tag in ["convnet", "lstm", "convlstm", "multistream", "vgg_imagenet", "linear"] {
            let kind: ModelKind = tag.parse().unwrap();
            assert_eq!(kind.as_str(), tag);
        }
    }

    #[test]
    fn unknown_model_type_fails() {
        let err = "transformer".parse::<ModelKind>().unwrap_err();
        assert!(matches!(err, ConfigError::UnknownModel(_)));
    }
}
