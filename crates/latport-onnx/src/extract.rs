use std::path::Path;

use bytes::Bytes;
use latport_core::{
    BackendError, InputShapeSpec, Result, Shape, FALLBACK_INPUT_DIMS, FALLBACK_INPUT_NAME,
};
use prost::Message;

use crate::proto::ModelProto;

/// Reads `(input name, dimensions)` of the first graph input of an ONNX
/// file. Dynamic dimensions come back as 1; a model without inputs yields
/// `("input_image", [1, 3, 224, 224])`.
pub fn extract(path: &Path) -> Result<(String, Shape)> {
    let data = std::fs::read(path).map_err(|e| BackendError::io(path, e))?;
    extract_from_bytes(path, Bytes::from(data))
}

/// Same as [`extract`] for an in-memory model; `path` is only used in errors.
pub fn extract_from_bytes(path: &Path, data: Bytes) -> Result<(String, Shape)> {
    let model = ModelProto::decode(data).map_err(|e| BackendError::MalformedModel {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let graph = model.graph.ok_or_else(|| BackendError::MalformedModel {
        path: path.to_path_buf(),
        detail: "model has no graph".to_string(),
    })?;

    let Some(first) = graph.input.first() else {
        return Ok((
            FALLBACK_INPUT_NAME.to_string(),
            Shape::from_slice(&FALLBACK_INPUT_DIMS),
        ));
    };

    let shape = match first.dims() {
        Some(dims) => Shape::from_declared(dims.iter().map(|d| d.static_value())),
        None => Shape::default(),
    };
    Ok((first.name.clone(), shape))
}

/// [`extract`] wrapped as a single-entry [`InputShapeSpec`].
pub fn input_spec(path: &Path) -> Result<InputShapeSpec> {
    let (name, shape) = extract(path)?;
    Ok(InputShapeSpec::single(name, shape))
}
