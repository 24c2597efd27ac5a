//! The subset of `onnx.proto` needed to read graph input declarations.
//!
//! Field numbers follow the upstream schema; everything else in a model
//! file is skipped as unknown fields while decoding.

#[derive(Clone, PartialEq, prost::Message)]
pub struct ModelProto {
    #[prost(int64, tag = "1")]
    pub ir_version: i64,
    #[prost(string, tag = "2")]
    pub producer_name: String,
    #[prost(message, optional, tag = "7")]
    pub graph: Option<GraphProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct GraphProto {
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(message, repeated, tag = "11")]
    pub input: Vec<ValueInfoProto>,
    #[prost(message, repeated, tag = "12")]
    pub output: Vec<ValueInfoProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ValueInfoProto {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, optional, tag = "2")]
    pub r#type: Option<TypeProto>,
}

/// Only the `tensor_type` arm of the upstream `value` oneof is read.
#[derive(Clone, PartialEq, prost::Message)]
pub struct TypeProto {
    #[prost(message, optional, tag = "1")]
    pub tensor_type: Option<TensorTypeProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TensorTypeProto {
    #[prost(int32, tag = "1")]
    pub elem_type: i32,
    #[prost(message, optional, tag = "2")]
    pub shape: Option<TensorShapeProto>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TensorShapeProto {
    #[prost(message, repeated, tag = "1")]
    pub dim: Vec<Dimension>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Dimension {
    #[prost(oneof = "DimensionValue", tags = "1, 2")]
    pub value: Option<DimensionValue>,
    #[prost(string, tag = "3")]
    pub denotation: String,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum DimensionValue {
    #[prost(int64, tag = "1")]
    DimValue(i64),
    /// Symbolic (dynamic) dimension such as `"batch"`.
    #[prost(string, tag = "2")]
    DimParam(String),
}

impl Dimension {
    pub fn fixed(value: i64) -> Self {
        Self {
            value: Some(DimensionValue::DimValue(value)),
            denotation: String::new(),
        }
    }

    pub fn symbolic(param: impl Into<String>) -> Self {
        Self {
            value: Some(DimensionValue::DimParam(param.into())),
            denotation: String::new(),
        }
    }

    /// Concrete value, if the dimension is static.
    pub fn static_value(&self) -> Option<i64> {
        match self.value {
            Some(DimensionValue::DimValue(v)) => Some(v),
            _ => None,
        }
    }
}

impl ValueInfoProto {
    /// A float tensor input with the given dimensions.
    pub fn tensor(name: impl Into<String>, dims: Vec<Dimension>) -> Self {
        Self {
            name: name.into(),
            r#type: Some(TypeProto {
                tensor_type: Some(TensorTypeProto {
                    elem_type: 1,
                    shape: Some(TensorShapeProto { dim: dims }),
                }),
            }),
        }
    }

    /// Declared dimensions, or `None` when the input carries no shape.
    pub fn dims(&self) -> Option<&[Dimension]> {
        self.r#type
            .as_ref()?
            .tensor_type
            .as_ref()?
            .shape
            .as_ref()
            .map(|s| s.dim.as_slice())
    }
}
