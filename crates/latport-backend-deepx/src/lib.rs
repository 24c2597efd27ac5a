//! DeepX NPU backend.
//!
//! Models are compiled with `dx_com` into `<save>/<base>/<base>.dxnn` and
//! profiled with the DeepX runtime's model runner, either on an accelerator
//! attached to this host or on a device reached over `adb`.

pub mod compiler;
pub mod profiler;

use std::sync::Arc;

use latport_core::{Backend, BackendConfig, ToolRunner};

pub use compiler::{DxCom, DXNN_EXT};
pub use profiler::{parse_latency_ms, DxrtProfiler};

pub type DeepxBackend = Backend<DxCom, DxrtProfiler>;

/// Builds the DeepX backend from the `compiler` and `profiler` sections of
/// `config`, running every external command through `runner`.
pub fn deepx_backend(config: &BackendConfig, runner: Arc<dyn ToolRunner>) -> DeepxBackend {
    Backend::new(
        DxCom::new(config.compiler.clone(), runner.clone()),
        DxrtProfiler::connect(config.profiler.clone(), runner),
    )
}
