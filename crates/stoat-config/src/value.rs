// ConfigValue — tagged union for heterogeneous experiment parameters

use std::fmt;

use crate::error::{ConfigError, Result};

/// A single configuration value.
///
/// Experiment configs are flat maps from key to `ConfigValue`; the typed
/// [`ExperimentConfig`](crate::ExperimentConfig) struct is extracted from
/// such a map after merging. `None` is a real value (it means "explicitly
/// unset") and participates in merging like any other: a later `None`
/// overwrites an earlier concrete value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    IntList(Vec<i64>),
    StrList(Vec<String>),
    None,
}

impl ConfigValue {
    /// Human-readable type name, used in type-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            ConfigValue::Str(_) => "string",
            ConfigValue::Int(_) => "int",
            ConfigValue::Float(_) => "float",
            ConfigValue::Bool(_) => "bool",
            ConfigValue::IntList(_) => "int list",
            ConfigValue::StrList(_) => "string list",
            ConfigValue::None => "none",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric coercion: accepts `Int`, or `Float` with zero fraction.
    ///
    /// Configs routinely compute lengths as ratios (e.g. a sequence length
    /// of `30 / 2`), so an integral float is accepted where an int is
    /// expected.
    pub fn as_usize(&self) -> Option<usize> {
        match self {
            ConfigValue::Int(i) if *i >= 0 => Some(*i as usize),
            ConfigValue::Float(f) if f.fract() == 0.0 && *f >= 0.0 => Some(*f as usize),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Int(i) => Some(*i as f64),
            ConfigValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, ConfigValue::None)
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Str(s) => write!(f, "{s}"),
            ConfigValue::Int(i) => write!(f, "{i}"),
            ConfigValue::Float(v) => write!(f, "{v}"),
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::IntList(xs) => {
                write!(f, "[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
            ConfigValue::StrList(xs) => {
                write!(f, "[")?;
                for (i, x) in xs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{x}")?;
                }
                write!(f, "]")
            }
            ConfigValue::None => write!(f, "none"),
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(s: &str) -> Self {
        ConfigValue::Str(s.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(s: String) -> Self {
        ConfigValue::Str(s)
    }
}

impl From<i64> for ConfigValue {
    fn from(i: i64) -> Self {
        ConfigValue::Int(i)
    }
}

impl From<usize> for ConfigValue {
    fn from(i: usize) -> Self {
        ConfigValue::Int(i as i64)
    }
}

impl From<f64> for ConfigValue {
    fn from(f: f64) -> Self {
        ConfigValue::Float(f)
    }
}

impl From<bool> for ConfigValue {
    fn from(b: bool) -> Self {
        ConfigValue::Bool(b)
    }
}

impl From<Vec<i64>> for ConfigValue {
    fn from(xs: Vec<i64>) -> Self {
        ConfigValue::IntList(xs)
    }
}

impl From<Vec<String>> for ConfigValue {
    fn from(xs: Vec<String>) -> Self {
        ConfigValue::StrList(xs)
    }
}

// Typed extraction helpers used by ExperimentConfig::from_raw.

pub(crate) fn expect_str(key: &str, v: &ConfigValue) -> Result<String> {
    v.as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| mismatch(key, "string", v))
}

pub(crate) fn expect_usize(key: &str, v: &ConfigValue) -> Result<usize> {
    v.as_usize().ok_or_else(|| mismatch(key, "int", v))
}

pub(crate) fn expect_f64(key: &str, v: &ConfigValue) -> Result<f64> {
    v.as_f64().ok_or_else(|| mismatch(key, "float", v))
}

pub(crate) fn expect_bool(key: &str, v: &ConfigValue) -> Result<bool> {
    v.as_bool().ok_or_else(|| mismatch(key, "bool", v))
}

pub(crate) fn mismatch(key: &str, expected: &'static str, got: &ConfigValue) -> ConfigError {
    ConfigError::TypeMismatch {
        key: key.to_string(),
        expected,
        got: got.type_name().to_string(),
    }
}
