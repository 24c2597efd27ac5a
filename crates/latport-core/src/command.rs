use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

/// An external program invocation with an explicit argument list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Appends `flag value`.
    pub fn flag(self, flag: &str, value: impl AsRef<OsStr>) -> Self {
        self.arg(flag).arg(value)
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Value following `flag`, if present.
    pub fn flag_value(&self, flag: &str) -> Option<&OsStr> {
        self.args
            .iter()
            .position(|a| a == flag)
            .and_then(|i| self.args.get(i + 1))
            .map(OsString::as_os_str)
    }

    /// Shell-like rendering for logs.
    pub fn display(&self) -> String {
        let mut out = self.program.display().to_string();
        for arg in &self.args {
            out.push(' ');
            out.push_str(&arg.to_string_lossy());
        }
        out
    }
}

/// Exit status and captured streams of a finished process. A non-zero
/// exit is reported here, not as an error.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// `None` when the process was terminated by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("failed to launch '{}': {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("process timed out after {0:?}")]
    TimedOut(Duration),

    #[error("io error while waiting for process: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves `program` the way a process spawn would: a bare name is looked
/// up on `PATH`, anything with a directory component must be a file.
pub fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() != 1 {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}

pub trait ToolRunner: Send + Sync {
    /// Runs `cmd` to completion. With a `timeout`, the process is killed
    /// once it elapses and [`RunError::TimedOut`] is returned.
    fn run(&self, cmd: &ToolCommand, timeout: Option<Duration>) -> Result<ToolOutput, RunError>;
}

impl<T: ToolRunner + ?Sized> ToolRunner for Arc<T> {
    fn run(&self, cmd: &ToolCommand, timeout: Option<Duration>) -> Result<ToolOutput, RunError> {
        (**self).run(cmd, timeout)
    }
}

/// Runs commands as real child processes.
///
/// Owns a current-thread tokio runtime used only to wait on children with
/// a deadline, so it must not be called from inside another tokio runtime.
pub struct SystemRunner {
    runtime: tokio::runtime::Runtime,
}

impl SystemRunner {
    pub fn new() -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self { runtime })
    }
}

impl ToolRunner for SystemRunner {
    fn run(&self, cmd: &ToolCommand, timeout: Option<Duration>) -> Result<ToolOutput, RunError> {
        debug!(command = %cmd.display(), ?timeout, "spawning process");
        self.runtime.block_on(async {
            let mut command = tokio::process::Command::new(cmd.program());
            command
                .args(cmd.get_args())
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);
            if let Some(dir) = cmd.get_current_dir() {
                command.current_dir(dir);
            }

            let child = command.spawn().map_err(|source| RunError::Spawn {
                program: cmd.program().to_path_buf(),
                source,
            })?;

            // Dropping the wait future on timeout drops the child, which kills it.
            let wait = child.wait_with_output();
            let output = match timeout {
                Some(limit) => tokio::time::timeout(limit, wait)
                    .await
                    .map_err(|_| RunError::TimedOut(limit))??,
                None => wait.await?,
            };

            Ok::<_, RunError>(ToolOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        })
    }
}
