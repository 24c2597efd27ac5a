use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::{
    base_name, BackendError, DeviceConfig, Result, RunError, ToolCommand, ToolOutput, ToolRunner,
};

/// Connection to a profiling target.
///
/// A device serves one profiling session at a time. Callers sharing a
/// device across threads must serialize `profile` calls themselves.
pub trait DeviceLink: Send + Sync {
    fn name(&self) -> String;

    /// Copies `local` onto the target and returns its path there.
    fn stage(&self, local: &Path) -> Result<String>;

    /// Runs `program` on the target.
    fn exec(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> std::result::Result<ToolOutput, RunError>;

    fn check(&self) -> bool;
}

pub fn connect(config: &DeviceConfig, runner: Arc<dyn ToolRunner>) -> Box<dyn DeviceLink> {
    match config {
        DeviceConfig::Local { staging_dir } => Box::new(LocalDevice {
            staging_dir: staging_dir.clone(),
            runner,
        }),
        DeviceConfig::Adb {
            serial,
            adb_path,
            remote_dir,
        } => Box::new(AdbDevice {
            serial: serial.clone(),
            adb_path: adb_path.clone(),
            remote_dir: remote_dir.clone(),
            runner,
        }),
    }
}

/// Accelerator attached to the host running this process.
pub struct LocalDevice {
    staging_dir: Option<PathBuf>,
    runner: Arc<dyn ToolRunner>,
}

impl LocalDevice {
    pub fn new(staging_dir: Option<PathBuf>, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            staging_dir,
            runner,
        }
    }
}

impl DeviceLink for LocalDevice {
    fn name(&self) -> String {
        "local".to_string()
    }

    fn stage(&self, local: &Path) -> Result<String> {
        if !local.is_file() {
            return Err(BackendError::DeviceUnreachable(format!(
                "cannot stage missing artifact {}",
                local.display()
            )));
        }
        let Some(dir) = &self.staging_dir else {
            return Ok(local.display().to_string());
        };

        let file_name = local
            .file_name()
            .ok_or_else(|| BackendError::DeviceUnreachable("artifact has no file name".into()))?;
        let target = dir.join(file_name);
        std::fs::create_dir_all(dir)
            .and_then(|_| std::fs::copy(local, &target))
            .map_err(|e| {
                BackendError::DeviceUnreachable(format!(
                    "cannot stage into {}: {e}",
                    dir.display()
                ))
            })?;
        debug!(target = %target.display(), "staged artifact locally");
        Ok(target.display().to_string())
    }

    fn exec(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> std::result::Result<ToolOutput, RunError> {
        self.runner
            .run(&ToolCommand::new(program).args(args), timeout)
    }

    /// Read-only: the staging dir, or its nearest existing ancestor, must be
    /// a writable directory.
    fn check(&self) -> bool {
        let Some(dir) = &self.staging_dir else {
            return true;
        };
        let existing = dir
            .ancestors()
            .find(|p| !p.as_os_str().is_empty() && p.exists())
            .unwrap_or(Path::new("."));
        match std::fs::metadata(existing) {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(e) => {
                debug!(dir = %existing.display(), error = %e, "staging dir not accessible");
                false
            }
        }
    }
}

/// Device reached over `adb`.
pub struct AdbDevice {
    serial: Option<String>,
    adb_path: PathBuf,
    remote_dir: String,
    runner: Arc<dyn ToolRunner>,
}

impl AdbDevice {
    pub fn new(
        serial: Option<String>,
        adb_path: impl Into<PathBuf>,
        remote_dir: impl Into<String>,
        runner: Arc<dyn ToolRunner>,
    ) -> Self {
        Self {
            serial,
            adb_path: adb_path.into(),
            remote_dir: remote_dir.into(),
            runner,
        }
    }

    fn adb(&self) -> ToolCommand {
        let cmd = ToolCommand::new(&self.adb_path);
        match &self.serial {
            Some(serial) => cmd.flag("-s", serial),
            None => cmd,
        }
    }

    fn remote_path(&self, local: &Path) -> String {
        let file = local
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_else(|| base_name(local));
        format!("{}/{file}", self.remote_dir.trim_end_matches('/'))
    }

    fn unreachable(&self, what: &str, detail: impl std::fmt::Display) -> BackendError {
        BackendError::DeviceUnreachable(format!("{} {what}: {detail}", self.name()))
    }
}

impl DeviceLink for AdbDevice {
    fn name(&self) -> String {
        match &self.serial {
            Some(serial) => format!("adb:{serial}"),
            None => "adb".to_string(),
        }
    }

    fn stage(&self, local: &Path) -> Result<String> {
        let remote = self.remote_path(local);

        let mkdir = self
            .adb()
            .args(["shell", "mkdir", "-p", self.remote_dir.as_str()]);
        let out = self
            .runner
            .run(&mkdir, None)
            .map_err(|e| self.unreachable("mkdir", e))?;
        if !out.success() {
            return Err(self.unreachable("mkdir", out.stderr.trim()));
        }

        let push = self.adb().arg("push").arg(local).arg(&remote);
        let out = self
            .runner
            .run(&push, None)
            .map_err(|e| self.unreachable("push", e))?;
        if !out.success() {
            return Err(self.unreachable("push", out.stderr.trim()));
        }

        info!(device = %self.name(), remote = %remote, "pushed artifact");
        Ok(remote)
    }

    fn exec(
        &self,
        program: &Path,
        args: &[String],
        timeout: Option<Duration>,
    ) -> std::result::Result<ToolOutput, RunError> {
        let cmd = self.adb().arg("shell").arg(program).args(args);
        self.runner.run(&cmd, timeout)
    }

    fn check(&self) -> bool {
        let cmd = self.adb().arg("get-state");
        match self.runner.run(&cmd, Some(Duration::from_secs(10))) {
            Ok(out) => out.success() && out.stdout.trim() == "device",
            Err(e) => {
                debug!(error = %e, "adb get-state failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
        reply: ToolOutput,
    }

    impl ToolRunner for Recorder {
        fn run(
            &self,
            cmd: &ToolCommand,
            _timeout: Option<Duration>,
        ) -> std::result::Result<ToolOutput, RunError> {
            self.calls.lock().unwrap().push(cmd.display());
            Ok(self.reply.clone())
        }
    }

    fn ok(stdout: &str) -> ToolOutput {
        ToolOutput {
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }
    }

    #[test]
    fn adb_push_and_shell_commands() {
        let runner = Arc::new(Recorder {
            reply: ok(""),
            ..Default::default()
        });
        let device = AdbDevice::new(
            Some("R58M".into()),
            "adb",
            "/data/local/tmp/lp/",
            runner.clone(),
        );

        let remote = device.stage(Path::new(file!())).unwrap();
        assert_eq!(remote, "/data/local/tmp/lp/device.rs");

        device
            .exec(Path::new("run_model"), &["-m".into(), remote], None)
            .unwrap();

        let calls = runner.calls.lock().unwrap();
        assert_eq!(calls[0], "adb -s R58M shell mkdir -p /data/local/tmp/lp/");
        assert!(calls[1].starts_with("adb -s R58M push "));
        assert!(calls[1].ends_with(" /data/local/tmp/lp/device.rs"));
        assert_eq!(
            calls[2],
            "adb -s R58M shell run_model -m /data/local/tmp/lp/device.rs"
        );
    }

    #[test]
    fn failed_push_is_unreachable() {
        let runner = Arc::new(Recorder {
            reply: ToolOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: "error: no devices/emulators found".into(),
            },
            ..Default::default()
        });
        let device = AdbDevice::new(None, "adb", "/data/local/tmp", runner);
        let err = device.stage(Path::new(file!())).unwrap_err();
        assert!(matches!(err, BackendError::DeviceUnreachable(ref m) if m.contains("no devices")));
    }

    #[test]
    fn adb_check_reads_state() {
        let reply = |stdout: &str| {
            Arc::new(Recorder {
                reply: ok(stdout),
                ..Default::default()
            })
        };
        assert!(AdbDevice::new(None, "adb", "/tmp", reply("device\n")).check());
        assert!(!AdbDevice::new(None, "adb", "/tmp", reply("offline\n")).check());
    }

    #[test]
    fn local_check_leaves_filesystem_alone() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("stage/deep");
        let device = LocalDevice::new(Some(staging.clone()), Arc::new(Recorder::default()));

        assert!(device.check());
        assert!(!staging.exists());
        assert!(!dir.path().join("stage").exists());

        let file = dir.path().join("plain");
        std::fs::write(&file, b"").unwrap();
        let blocked = LocalDevice::new(Some(file.join("stage")), Arc::new(Recorder::default()));
        assert!(!blocked.check());
    }

    #[test]
    fn local_staging_copies_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("net.dxnn");
        std::fs::write(&src, b"dxnn").unwrap();
        let staging = dir.path().join("stage");

        let device = LocalDevice::new(Some(staging.clone()), Arc::new(Recorder::default()));
        let staged = device.stage(&src).unwrap();
        assert_eq!(PathBuf::from(&staged), staging.join("net.dxnn"));
        assert_eq!(std::fs::read(staged).unwrap(), b"dxnn");

        let in_place = LocalDevice::new(None, Arc::new(Recorder::default()));
        assert_eq!(in_place.stage(&src).unwrap(), src.display().to_string());
        assert!(in_place.stage(&dir.path().join("missing.dxnn")).is_err());
    }
}
