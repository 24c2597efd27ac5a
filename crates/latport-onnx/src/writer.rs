use std::path::{Path, PathBuf};

use latport_core::{config_path_for, is_onnx, BackendError, CompileConfig, Result};
use tracing::{debug, info};

use crate::extract::input_spec;

/// Writes `<base>.json` next to every `.onnx` file directly inside
/// `onnx_dir` and returns the written paths in file-name order.
///
/// Existing configs are overwritten; unchanged models produce identical
/// bytes. Other files are skipped.
pub fn write_configs(onnx_dir: &Path) -> Result<Vec<PathBuf>> {
    let models = onnx_files(onnx_dir)?;
    let mut written = Vec::with_capacity(models.len());
    for model in &models {
        written.push(write_config(model)?);
    }
    info!(dir = %onnx_dir.display(), count = written.len(), "generated compile configs");
    Ok(written)
}

/// `.onnx` files directly inside `dir`, sorted by path.
pub fn onnx_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut models = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| BackendError::io(dir, e))?;
    for entry in entries {
        let path = entry.map_err(|e| BackendError::io(dir, e))?.path();
        if path.is_file() && is_onnx(&path) {
            models.push(path);
        } else {
            debug!(path = %path.display(), "skipping non-model entry");
        }
    }
    models.sort();
    Ok(models)
}

/// Writes the compile config for a single model and returns its path.
pub fn write_config(model_path: &Path) -> Result<PathBuf> {
    let spec = input_spec(model_path)?;
    let config_path = config_path_for(model_path);
    CompileConfig::from(&spec).write(&config_path)?;
    for (name, shape) in spec.iter() {
        info!(model = %model_path.display(), input = %name.0, %shape, "wrote compile config");
    }
    Ok(config_path)
}
