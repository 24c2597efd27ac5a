use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub type Result<T> = std::result::Result<T, BackendError>;

/// Errors raised while preparing, compiling or profiling a model.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The file could not be parsed as an interchange-format model.
    #[error("malformed model '{}': {detail}", path.display())]
    MalformedModel { path: PathBuf, detail: String },

    #[error("model not found: {}", .0.display())]
    MissingModel(PathBuf),

    /// The sibling compile config was not found next to the model.
    #[error("compile config not found: {}", .0.display())]
    MissingConfig(PathBuf),

    /// The vendor toolchain failed or could not be launched.
    #[error("toolchain failed for '{model}' (exit code {code:?}): {stderr}")]
    ToolchainExecution {
        model: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The toolchain reported success but the compiled file is absent.
    #[error("compiled artifact not produced: {}", .0.display())]
    MissingOutput(PathBuf),

    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),

    #[error("{phase} {trial} did not finish within {timeout:?}")]
    ExecutionTimeout {
        phase: RunPhase,
        trial: usize,
        timeout: Duration,
    },

    #[error("unsupported metric '{0}'")]
    UnsupportedMetric(String),

    /// An on-device run exited non-zero.
    #[error("{phase} {trial} failed on device (exit code {code:?}): {stderr}")]
    RunFailed {
        phase: RunPhase,
        trial: usize,
        code: Option<i32>,
        stderr: String,
    },

    /// Device output did not contain a usable timing sample.
    #[error("cannot parse profiler output: {0}")]
    MalformedOutput(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error at '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Whether an on-device run was a discarded warm-up or a timed trial.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunPhase {
    Warmup,
    Trial,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RunPhase::Warmup => "warm-up run",
            RunPhase::Trial => "run",
        })
    }
}

impl BackendError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for errors raised before or during compilation.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedModel { .. }
                | Self::MissingModel(_)
                | Self::MissingConfig(_)
                | Self::ToolchainExecution { .. }
                | Self::MissingOutput(_)
        )
    }
}
