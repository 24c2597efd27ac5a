#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use latport_core::{
    BackendError, DeviceLink, Result, RunError, ToolCommand, ToolOutput, ToolRunner,
};
use latport_onnx::proto::{Dimension, GraphProto, ModelProto, ValueInfoProto};
use prost::Message;

/// Stands in for `dx_com`: records every command and optionally writes
/// `<-o>/<stem of -m>.dxnn`.
pub struct StubToolchain {
    pub code: i32,
    pub stderr: String,
    pub emit_output: bool,
    pub calls: Mutex<Vec<ToolCommand>>,
}

impl StubToolchain {
    pub fn succeeding() -> Self {
        Self {
            code: 0,
            stderr: String::new(),
            emit_output: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self {
            emit_output: false,
            ..Self::succeeding()
        }
    }

    pub fn failing(stderr: &str) -> Self {
        Self {
            code: 1,
            stderr: stderr.to_string(),
            emit_output: false,
            ..Self::succeeding()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ToolRunner for StubToolchain {
    fn run(
        &self,
        cmd: &ToolCommand,
        _timeout: Option<Duration>,
    ) -> std::result::Result<ToolOutput, RunError> {
        self.calls.lock().unwrap().push(cmd.clone());
        if self.emit_output {
            let model = PathBuf::from(cmd.flag_value("-m").unwrap());
            let out_dir = PathBuf::from(cmd.flag_value("-o").unwrap());
            let stem = model.file_stem().unwrap().to_string_lossy().into_owned();
            std::fs::write(out_dir.join(format!("{stem}.dxnn")), b"DXNN").unwrap();
        }
        Ok(ToolOutput {
            code: Some(self.code),
            stdout: "dx_com: done\n".to_string(),
            stderr: self.stderr.clone(),
        })
    }
}

pub enum RunBehaviour {
    /// Prints the next latency from the queue, repeating the last one.
    Latencies(Mutex<VecDeque<String>>),
    Timeout,
    Exit(i32, String),
}

/// In-memory device that records what was staged and how often it ran.
pub struct FakeDevice {
    pub reachable: bool,
    pub behaviour: RunBehaviour,
    pub staged: Mutex<Vec<PathBuf>>,
    pub runs: AtomicUsize,
}

impl FakeDevice {
    pub fn printing(lines: &[&str]) -> Self {
        Self {
            reachable: true,
            behaviour: RunBehaviour::Latencies(Mutex::new(
                lines.iter().map(|l| l.to_string()).collect(),
            )),
            staged: Mutex::new(Vec::new()),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn with(behaviour: RunBehaviour) -> Self {
        Self {
            behaviour,
            ..Self::printing(&[])
        }
    }

    pub fn unreachable() -> Self {
        Self {
            reachable: false,
            ..Self::printing(&["Latency: 1 ms"])
        }
    }
}

impl DeviceLink for &'static FakeDevice {
    fn name(&self) -> String {
        "fake".to_string()
    }

    fn stage(&self, local: &Path) -> Result<String> {
        if !self.reachable {
            return Err(BackendError::DeviceUnreachable("fake device offline".into()));
        }
        self.staged.lock().unwrap().push(local.to_path_buf());
        Ok(format!("/remote/{}", local.file_name().unwrap().to_string_lossy()))
    }

    fn exec(
        &self,
        _program: &Path,
        _args: &[String],
        timeout: Option<Duration>,
    ) -> std::result::Result<ToolOutput, RunError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        match &self.behaviour {
            RunBehaviour::Latencies(queue) => {
                let mut queue = queue.lock().unwrap();
                let line = if queue.len() > 1 {
                    queue.pop_front().unwrap()
                } else {
                    queue.front().cloned().unwrap_or_default()
                };
                Ok(ToolOutput {
                    code: Some(0),
                    stdout: format!("DXRT run\n{line}\n"),
                    stderr: String::new(),
                })
            }
            RunBehaviour::Timeout => Err(RunError::TimedOut(timeout.unwrap())),
            RunBehaviour::Exit(code, stderr) => Ok(ToolOutput {
                code: Some(*code),
                stdout: String::new(),
                stderr: stderr.clone(),
            }),
        }
    }

    fn check(&self) -> bool {
        self.reachable
    }
}

/// Leaks a fake device so tests can inspect it after handing it to a profiler.
pub fn leak(device: FakeDevice) -> &'static FakeDevice {
    Box::leak(Box::new(device))
}

pub fn write_onnx(dir: &Path, name: &str, input: &str, dims: &[i64]) -> PathBuf {
    let model = ModelProto {
        ir_version: 8,
        producer_name: "onnx".into(),
        graph: Some(GraphProto {
            name: name.into(),
            input: vec![ValueInfoProto::tensor(
                input,
                dims.iter().copied().map(Dimension::fixed).collect(),
            )],
            output: Vec::new(),
        }),
    };
    let path = dir.join(format!("{name}.onnx"));
    std::fs::write(&path, model.encode_to_vec()).unwrap();
    path
}
