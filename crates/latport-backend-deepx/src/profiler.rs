use std::sync::Arc;

use latport_core::{
    connect, ensure_supported, find_program, summarize, BackendError, CompiledArtifact,
    DeviceConfig, DeviceLink, ProfileOptions, ProfileResult, Profiler, ProfilerOptions, Result,
    RunError, RunPhase, ToolRunner,
};
use tracing::{debug, info};

/// Profiles `.dxnn` models with the DeepX runtime's model runner.
///
/// Each trial is one runner invocation whose stdout reports a latency;
/// warm-up runs are executed first and discarded. Samples are reduced with
/// the configured [`latport_core::Reduction`].
pub struct DxrtProfiler {
    options: ProfilerOptions,
    device: Box<dyn DeviceLink>,
}

impl DxrtProfiler {
    pub fn new(options: ProfilerOptions, device: Box<dyn DeviceLink>) -> Self {
        Self { options, device }
    }

    /// Builds the device link described by `options.device`.
    pub fn connect(options: ProfilerOptions, runner: Arc<dyn ToolRunner>) -> Self {
        let device = connect(&options.device, runner);
        Self::new(options, device)
    }

    pub fn options(&self) -> &ProfilerOptions {
        &self.options
    }

    fn run_once(&self, remote: &str, phase: RunPhase, trial: usize) -> Result<f64> {
        let args = self.options.render_run_args(remote);
        let timeout = self.options.run_timeout();
        let out = self
            .device
            .exec(&self.options.runner_path, &args, Some(timeout))
            .map_err(|e| match e {
                RunError::TimedOut(_) => BackendError::ExecutionTimeout {
                    phase,
                    trial,
                    timeout,
                },
                other => BackendError::DeviceUnreachable(format!("{}: {other}", self.device.name())),
            })?;
        if !out.success() {
            return Err(BackendError::RunFailed {
                phase,
                trial,
                code: out.code,
                stderr: out.stderr,
            });
        }
        parse_latency_ms(&out.stdout).ok_or_else(|| {
            BackendError::MalformedOutput(format!(
                "{phase} {trial} printed no latency: {:?}",
                out.stdout.trim()
            ))
        })
    }
}

impl Profiler for DxrtProfiler {
    fn name(&self) -> &'static str {
        "dxrt"
    }

    fn profile(
        &self,
        artifact: &CompiledArtifact,
        metrics: &[&str],
        opts: &ProfileOptions,
    ) -> Result<ProfileResult> {
        ensure_supported(metrics)?;
        let trials = opts.trials.unwrap_or(self.options.trials);
        if trials == 0 {
            return Err(BackendError::Config("trials must be at least 1".into()));
        }

        let model = artifact.model();
        debug!(model = model.name(), format = ?model.format(), "staging");
        let remote = self.device.stage(model.path())?;
        for warmup in 0..self.options.warmup {
            self.run_once(&remote, RunPhase::Warmup, warmup)?;
        }
        let samples = (0..trials)
            .map(|trial| self.run_once(&remote, RunPhase::Trial, trial))
            .collect::<Result<Vec<_>>>()?;
        debug!(model = %artifact.name, ?samples, "latency samples (ms)");

        let metrics = summarize(metrics, &samples, self.options.reduction)?;
        info!(model = %artifact.name, device = %self.device.name(), trials, ?metrics, "profiled on device");
        Ok(ProfileResult {
            metrics,
            artifact: artifact.path.clone(),
            trials,
        })
    }

    /// For a local device the runner must also resolve on this host; over
    /// `adb` it lives on the target and is not looked up.
    fn check(&self) -> bool {
        if !self.device.check() {
            return false;
        }
        match self.options.device {
            DeviceConfig::Local { .. } => {
                let found = find_program(&self.options.runner_path).is_some();
                if !found {
                    debug!(runner = %self.options.runner_path.display(), "runner not found");
                }
                found
            }
            DeviceConfig::Adb { .. } => true,
        }
    }
}

/// Latency in milliseconds from runner output.
///
/// Takes the first number after the word "latency" on the first line that
/// has one. The unit may follow the number (`12.3ms`, `850 us`) or precede
/// it (`Latency (us): 850`); without a unit the value is read as ms.
pub fn parse_latency_ms(text: &str) -> Option<f64> {
    text.lines().find_map(parse_line)
}

fn parse_line(line: &str) -> Option<f64> {
    let lower = line.to_ascii_lowercase();
    let start = lower.find("latency")? + "latency".len();
    let tokens: Vec<&str> = lower[start..]
        .split(|c: char| c.is_whitespace() || matches!(c, ':' | '=' | ','))
        .filter(|t| !t.is_empty())
        .collect();

    let mut declared_unit = None;
    for (i, token) in tokens.iter().enumerate() {
        let split = token
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(token.len());
        let (number, suffix) = token.split_at(split);
        let Ok(value) = number.parse::<f64>() else {
            if let Some(unit) = Unit::parse(token) {
                declared_unit = Some(unit);
            }
            continue;
        };
        let unit = Unit::parse(suffix)
            .or_else(|| tokens.get(i + 1).and_then(|next| Unit::parse(next)))
            .or(declared_unit)
            .unwrap_or(Unit::Millis);
        return Some(unit.to_ms(value));
    }
    None
}

#[derive(Clone, Copy)]
enum Unit {
    Micros,
    Millis,
    Secs,
}

impl Unit {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim_matches(|c: char| matches!(c, '(' | ')' | '[' | ']')) {
            "us" | "µs" | "usec" => Some(Unit::Micros),
            "ms" | "msec" => Some(Unit::Millis),
            "s" | "sec" => Some(Unit::Secs),
            _ => None,
        }
    }

    fn to_ms(self, value: f64) -> f64 {
        match self {
            Unit::Micros => value / 1000.0,
            Unit::Millis => value,
            Unit::Secs => value * 1000.0,
        }
    }
}
