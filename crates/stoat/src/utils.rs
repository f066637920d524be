// Results directory helpers

use std::fs;
use std::path::{Path, PathBuf};

use crate::Result;

/// Per-experiment results directory under `base`, created on first use.
pub fn get_create_results_dir(base: &Path, experiment: &str) -> Result<PathBuf> {
    let dir = base.join(experiment);
    fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = get_create_results_dir(&tmp.path().join("results"), "exp_a").unwrap();
        assert!(dir.is_dir());
        assert!(dir.ends_with("results/exp_a"));
        // idempotent
        get_create_results_dir(&tmp.path().join("results"), "exp_a").unwrap();
    }
}
