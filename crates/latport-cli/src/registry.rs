use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use latport_backend_deepx::deepx_backend;
use latport_core::reference::reference_backend;
use latport_core::{BackendConfig, BackendKind, ProfileBackend, SystemRunner, ToolRunner};

pub fn load_config(path: Option<&Path>) -> Result<BackendConfig> {
    match path {
        Some(path) => BackendConfig::from_yaml_file(path)
            .with_context(|| format!("failed to load backend config: {}", path.display())),
        None => Ok(BackendConfig::default()),
    }
}

/// Builds the backend named by `config.kind`.
pub fn build_backend(config: &BackendConfig) -> Result<Box<dyn ProfileBackend>> {
    config.validate()?;
    let backend: Box<dyn ProfileBackend> = match config.kind {
        BackendKind::Deepx => {
            let runner: Arc<dyn ToolRunner> =
                Arc::new(SystemRunner::new().context("failed to start process runtime")?);
            Box::new(deepx_backend(config, runner))
        }
        BackendKind::Reference => Box::new(reference_backend()),
    };
    tracing::info!(backend = %backend.name(), "backend ready");
    Ok(backend)
}
