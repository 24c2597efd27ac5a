use std::path::Path;

use tracing::{debug, info, warn};

use crate::{base_name, BackendError, CompiledArtifact, InputShapeSpec, ProfileResult, Result};

/// Per-call options shared by `profile` and `profile_model_file`.
#[derive(Clone, Debug, Default)]
pub struct ProfileOptions {
    /// Forwarded to both the compiler and the profiler.
    pub input_shape: Option<InputShapeSpec>,
    /// Overrides the profiler's configured trial count.
    pub trials: Option<usize>,
}

pub trait Compiler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Compiles `model_path` into a per-model directory under `save_path`.
    ///
    /// `input_shape` is part of the contract for targets that take shapes
    /// directly; compilers driven by the sibling config file ignore it.
    fn compile(
        &self,
        model_path: &Path,
        save_path: &Path,
        input_shape: Option<&InputShapeSpec>,
    ) -> Result<CompiledArtifact>;

    /// Whether the toolchain looks usable. Must not change any state.
    fn check(&self) -> bool {
        true
    }
}

pub trait Profiler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Stages `artifact`, runs it and reduces the timings to `metrics`.
    fn profile(
        &self,
        artifact: &CompiledArtifact,
        metrics: &[&str],
        opts: &ProfileOptions,
    ) -> Result<ProfileResult>;

    fn check(&self) -> bool {
        true
    }
}

/// Lifecycle of one `profile_model_file` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Uncompiled,
    Compiling,
    Compiled,
    Profiling,
    Profiled,
    CompileFailed,
    ProfileFailed,
}

impl Stage {
    pub fn advance(self) -> Option<Stage> {
        match self {
            Stage::Uncompiled => Some(Stage::Compiling),
            Stage::Compiling => Some(Stage::Compiled),
            Stage::Compiled => Some(Stage::Profiling),
            Stage::Profiling => Some(Stage::Profiled),
            _ => None,
        }
    }

    pub fn fail(self) -> Option<Stage> {
        match self {
            Stage::Compiling => Some(Stage::CompileFailed),
            Stage::Profiling => Some(Stage::ProfileFailed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Stage::Profiled | Stage::CompileFailed | Stage::ProfileFailed
        )
    }
}

struct StageTracker<'a> {
    model: &'a str,
    stage: Stage,
}

impl<'a> StageTracker<'a> {
    fn new(model: &'a str) -> Self {
        Self {
            model,
            stage: Stage::Uncompiled,
        }
    }

    fn advance(&mut self) {
        if let Some(next) = self.stage.advance() {
            debug!(model = self.model, from = ?self.stage, to = ?next, "stage");
            self.stage = next;
        }
    }

    fn fail(&mut self, err: &BackendError) {
        if let Some(next) = self.stage.fail() {
            warn!(model = self.model, stage = ?next, error = %err, "model failed");
            self.stage = next;
        }
    }
}

/// A hardware target: a compiler and a profiler behind one interface.
///
/// Compiles and profiles one model at a time. No retries happen here;
/// errors from either side are returned as-is.
pub struct Backend<C, P> {
    compiler: C,
    profiler: P,
}

impl<C: Compiler, P: Profiler> Backend<C, P> {
    pub fn new(compiler: C, profiler: P) -> Self {
        Self { compiler, profiler }
    }

    pub fn name(&self) -> String {
        format!("{}+{}", self.compiler.name(), self.profiler.name())
    }

    pub fn compiler(&self) -> &C {
        &self.compiler
    }

    pub fn profiler(&self) -> &P {
        &self.profiler
    }

    pub fn compile(
        &self,
        model_path: &Path,
        save_path: &Path,
        input_shape: Option<&InputShapeSpec>,
    ) -> Result<CompiledArtifact> {
        self.compiler.compile(model_path, save_path, input_shape)
    }

    pub fn profile(
        &self,
        artifact: &CompiledArtifact,
        metrics: &[&str],
        opts: &ProfileOptions,
    ) -> Result<ProfileResult> {
        self.profiler.profile(artifact, metrics, opts)
    }

    /// Compiles `model_path` into `save_path`, then profiles the result.
    /// A compile failure means the profiler is never called.
    pub fn profile_model_file(
        &self,
        model_path: &Path,
        save_path: &Path,
        metrics: &[&str],
        opts: &ProfileOptions,
    ) -> Result<ProfileResult> {
        let name = base_name(model_path);
        let mut run = StageTracker::new(&name);

        run.advance();
        let artifact = self
            .compile(model_path, save_path, opts.input_shape.as_ref())
            .inspect_err(|e| run.fail(e))?;
        run.advance();

        run.advance();
        let result = self
            .profile(&artifact, metrics, opts)
            .inspect_err(|e| run.fail(e))?;
        run.advance();

        info!(model = %name, metrics = ?result.metrics, trials = result.trials, "profiled");
        Ok(result)
    }

    /// Liveness of the toolchain and the device.
    pub fn test_connection(&self) -> bool {
        let compiler_ok = self.compiler.check();
        let profiler_ok = self.profiler.check();
        info!(
            backend = %self.name(),
            compiler_ok, profiler_ok, "connection check"
        );
        compiler_ok && profiler_ok
    }
}

/// Object-safe view of a [`Backend`], so drivers can pick a target at runtime.
pub trait ProfileBackend: Send + Sync {
    fn name(&self) -> String;

    fn profile_model_file(
        &self,
        model_path: &Path,
        save_path: &Path,
        metrics: &[&str],
        opts: &ProfileOptions,
    ) -> Result<ProfileResult>;

    fn test_connection(&self) -> bool;
}

impl<C: Compiler, P: Profiler> ProfileBackend for Backend<C, P> {
    fn name(&self) -> String {
        Backend::name(self)
    }

    fn profile_model_file(
        &self,
        model_path: &Path,
        save_path: &Path,
        metrics: &[&str],
        opts: &ProfileOptions,
    ) -> Result<ProfileResult> {
        Backend::profile_model_file(self, model_path, save_path, metrics, opts)
    }

    fn test_connection(&self) -> bool {
        Backend::test_connection(self)
    }
}
