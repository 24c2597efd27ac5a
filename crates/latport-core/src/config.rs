//! Backend configuration, loaded from YAML.
//!
//! ```yaml
//! kind: deepx
//! compiler:
//!   toolchain_path: /opt/dx_com/dx_com
//!   optimization_flag: --shrink
//! profiler:
//!   device:
//!     type: adb
//!     serial: 0123456789
//!   trials: 20
//!   reduction: median
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{BackendError, Reduction, Result};

/// Placeholder in [`ProfilerOptions::run_args`] replaced by the staged artifact path.
pub const MODEL_PLACEHOLDER: &str = "{model}";

/// Which Compiler/Profiler pair a backend is built from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Deepx,
    /// Hardware-free dry run.
    Reference,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default)]
    pub kind: BackendKind,

    #[serde(default)]
    pub compiler: CompilerOptions,

    #[serde(default)]
    pub profiler: ProfilerOptions,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompilerOptions {
    /// Vendor compiler executable.
    #[serde(default = "default_toolchain_path")]
    pub toolchain_path: PathBuf,

    #[serde(default = "default_optimization_flag")]
    pub optimization_flag: String,

    #[serde(default)]
    pub extra_args: Vec<String>,

    /// No limit when unset.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            toolchain_path: default_toolchain_path(),
            optimization_flag: default_optimization_flag(),
            extra_args: Vec::new(),
            timeout_secs: None,
        }
    }
}

impl CompilerOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeviceConfig {
    /// Accelerator attached to this host.
    Local {
        #[serde(default)]
        staging_dir: Option<PathBuf>,
    },
    /// Device reached through `adb`.
    Adb {
        #[serde(default)]
        serial: Option<String>,
        #[serde(default = "default_adb_path")]
        adb_path: PathBuf,
        #[serde(default = "default_remote_dir")]
        remote_dir: String,
    },
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self::Local { staging_dir: None }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProfilerOptions {
    #[serde(default)]
    pub device: DeviceConfig,

    /// On-device runner executable.
    #[serde(default = "default_runner_path")]
    pub runner_path: PathBuf,

    #[serde(default = "default_run_args")]
    pub run_args: Vec<String>,

    #[serde(default = "default_trials")]
    pub trials: usize,

    #[serde(default = "default_warmup")]
    pub warmup: usize,

    #[serde(default)]
    pub reduction: Reduction,

    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,
}

impl Default for ProfilerOptions {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            runner_path: default_runner_path(),
            run_args: default_run_args(),
            trials: default_trials(),
            warmup: default_warmup(),
            reduction: Reduction::default(),
            run_timeout_secs: default_run_timeout_secs(),
        }
    }
}

impl ProfilerOptions {
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }

    /// Runner arguments with the placeholder replaced by `model`.
    pub fn render_run_args(&self, model: &str) -> Vec<String> {
        self.run_args
            .iter()
            .map(|a| a.replace(MODEL_PLACEHOLDER, model))
            .collect()
    }
}

fn default_toolchain_path() -> PathBuf {
    PathBuf::from("dx_com")
}

fn default_optimization_flag() -> String {
    "--shrink".to_string()
}

fn default_adb_path() -> PathBuf {
    PathBuf::from("adb")
}

fn default_remote_dir() -> String {
    "/data/local/tmp/latport".to_string()
}

fn default_runner_path() -> PathBuf {
    PathBuf::from("run_model")
}

fn default_run_args() -> Vec<String> {
    ["-m", MODEL_PLACEHOLDER, "-l", "1"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_trials() -> usize {
    10
}

fn default_warmup() -> usize {
    2
}

fn default_run_timeout_secs() -> u64 {
    60
}

impl BackendConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| BackendError::io(path, e))?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: BackendConfig = serde_yaml::from_str(yaml)
            .map_err(|e| BackendError::Config(format!("YAML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.profiler.trials == 0 {
            return Err(BackendError::Config("profiler.trials must be at least 1".into()));
        }
        if self.profiler.run_timeout_secs == 0 {
            return Err(BackendError::Config(
                "profiler.run_timeout_secs must be positive".into(),
            ));
        }
        if !self
            .profiler
            .run_args
            .iter()
            .any(|a| a.contains(MODEL_PLACEHOLDER))
        {
            return Err(BackendError::Config(format!(
                "profiler.run_args must reference the model via '{MODEL_PLACEHOLDER}'"
            )));
        }
        Ok(())
    }
}
