use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{BackendError, Result, Shape};

/// Input used when a model declares no graph inputs.
pub const FALLBACK_INPUT_NAME: &str = "input_image";
pub const FALLBACK_INPUT_DIMS: [usize; 4] = [1, 3, 224, 224];

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IOName(pub String);

/// Input tensor name to dimensions. Never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputShapeSpec {
    inputs: BTreeMap<IOName, Shape>,
}

impl InputShapeSpec {
    pub fn single(name: impl Into<String>, shape: Shape) -> Self {
        let mut inputs = BTreeMap::new();
        inputs.insert(IOName(name.into()), shape);
        Self { inputs }
    }

    pub fn fallback() -> Self {
        Self::single(FALLBACK_INPUT_NAME, Shape::from_slice(&FALLBACK_INPUT_DIMS))
    }

    pub fn from_map(inputs: BTreeMap<IOName, Shape>) -> Result<Self> {
        if inputs.is_empty() {
            return Err(BackendError::Config(
                "input shape spec needs at least one input".to_string(),
            ));
        }
        Ok(Self { inputs })
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Shape> {
        self.inputs.get(&IOName(name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&IOName, &Shape)> {
        self.inputs.iter()
    }
}

/// Persisted compiler configuration: `{"inputs": {<name>: [<dims>]}}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompileConfig {
    pub inputs: BTreeMap<IOName, Shape>,
}

impl From<&InputShapeSpec> for CompileConfig {
    fn from(spec: &InputShapeSpec) -> Self {
        Self {
            inputs: spec.inputs.clone(),
        }
    }
}

impl CompileConfig {
    /// Pretty JSON with two-space indentation and a trailing newline.
    /// Output depends only on the contents, so regeneration is byte-stable.
    pub fn to_json(&self) -> Result<String> {
        let mut text = serde_json::to_string_pretty(self)
            .map_err(|e| BackendError::Config(format!("cannot serialise compile config: {e}")))?;
        text.push('\n');
        Ok(text)
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let text = self.to_json()?;
        std::fs::write(path, text).map_err(|e| BackendError::io(path, e))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| BackendError::io(path, e))?;
        serde_json::from_str(&text).map_err(|e| {
            BackendError::Config(format!("invalid compile config '{}': {e}", path.display()))
        })
    }

    pub fn to_spec(&self) -> Result<InputShapeSpec> {
        InputShapeSpec::from_map(self.inputs.clone())
    }
}
