//! Hardware-free backend for dry runs of a pipeline.

use std::path::Path;

use tracing::debug;

use crate::{
    base_name, config_path_for, BackendError, CompiledArtifact, Compiler, InputShapeSpec,
    ProfileOptions, ProfileResult, Profiler, Result,
};

/// Checks the compile preconditions and hands the source model back as
/// the artifact. Creates nothing on disk.
#[derive(Clone, Copy, Debug, Default)]
pub struct PassthroughCompiler;

impl Compiler for PassthroughCompiler {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn compile(
        &self,
        model_path: &Path,
        _save_path: &Path,
        _input_shape: Option<&InputShapeSpec>,
    ) -> Result<CompiledArtifact> {
        if !model_path.is_file() {
            return Err(BackendError::MissingModel(model_path.to_path_buf()));
        }
        let config = config_path_for(model_path);
        if !config.is_file() {
            return Err(BackendError::MissingConfig(config));
        }
        Ok(CompiledArtifact {
            name: base_name(model_path),
            output_dir: model_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
            path: model_path.to_path_buf(),
            source: model_path.to_path_buf(),
        })
    }
}

/// Returns an empty result without touching any device.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopProfiler;

impl Profiler for NoopProfiler {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn profile(
        &self,
        artifact: &CompiledArtifact,
        metrics: &[&str],
        _opts: &ProfileOptions,
    ) -> Result<ProfileResult> {
        debug!(artifact = %artifact.path.display(), ?metrics, "noop profile");
        Ok(ProfileResult::empty(&artifact.path))
    }
}

pub type ReferenceBackend = crate::Backend<PassthroughCompiler, NoopProfiler>;

pub fn reference_backend() -> ReferenceBackend {
    crate::Backend::new(PassthroughCompiler, NoopProfiler)
}
