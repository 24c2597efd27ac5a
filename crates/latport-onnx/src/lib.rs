//! ONNX input introspection and compile-config generation.

pub mod extract;
pub mod proto;
pub mod writer;

pub use extract::{extract, extract_from_bytes, input_spec};
pub use writer::{onnx_files, write_config, write_configs};
