use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Extension of interchange-format (ONNX) model files.
pub const ONNX_EXT: &str = "onnx";
/// Extension of the compile-config file written next to each model.
pub const CONFIG_EXT: &str = "json";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Onnx,
    Compiled,
}

/// A model file on disk, identified by its base name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelArtifact {
    name: String,
    path: PathBuf,
    format: ModelFormat,
}

impl ModelArtifact {
    pub fn new(path: impl Into<PathBuf>, format: ModelFormat) -> Self {
        let path = path.into();
        Self {
            name: base_name(&path),
            path,
            format,
        }
    }

    pub fn onnx(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ModelFormat::Onnx)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn format(&self) -> ModelFormat {
        self.format
    }

    pub fn config_path(&self) -> PathBuf {
        config_path_for(&self.path)
    }
}

/// Output of a successful compilation. The compiled file existed on disk
/// when this value was created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub name: String,
    pub output_dir: PathBuf,
    pub path: PathBuf,
    /// Model the artifact was compiled from.
    pub source: PathBuf,
}

impl CompiledArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The compiled file as a model tagged [`ModelFormat::Compiled`].
    pub fn model(&self) -> ModelArtifact {
        ModelArtifact::new(&self.path, ModelFormat::Compiled)
    }
}

/// File name without its final extension.
pub fn base_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Path of the compile config that belongs to `model_path`: same directory,
/// same base name, [`CONFIG_EXT`] extension.
pub fn config_path_for(model_path: &Path) -> PathBuf {
    let file = format!("{}.{CONFIG_EXT}", base_name(model_path));
    match model_path.parent() {
        Some(dir) => dir.join(file),
        None => PathBuf::from(file),
    }
}

pub fn is_onnx(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ONNX_EXT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_sibling_with_json_extension() {
        assert_eq!(
            config_path_for(Path::new("/work/kernels/net_a.onnx")),
            PathBuf::from("/work/kernels/net_a.json")
        );
        assert_eq!(
            config_path_for(Path::new("conv.bn.relu.onnx")),
            PathBuf::from("conv.bn.relu.json")
        );
    }

    #[test]
    fn artifact_name_from_file_stem() {
        let model = ModelArtifact::onnx("/tmp/models/net_b.onnx");
        assert_eq!(model.name(), "net_b");
        assert_eq!(model.format(), ModelFormat::Onnx);
        assert_eq!(model.config_path(), PathBuf::from("/tmp/models/net_b.json"));
    }

    #[test]
    fn compiled_artifact_is_tagged_compiled() {
        let compiled = CompiledArtifact {
            name: "net_a".into(),
            output_dir: PathBuf::from("out/net_a"),
            path: PathBuf::from("out/net_a/net_a.dxnn"),
            source: PathBuf::from("kernels/net_a.onnx"),
        };
        let model = compiled.model();
        assert_eq!(model.format(), ModelFormat::Compiled);
        assert_eq!(model.name(), "net_a");
        assert_eq!(model.path(), compiled.path());
    }

    #[test]
    fn onnx_extension_check() {
        assert!(is_onnx(Path::new("a/b.onnx")));
        assert!(!is_onnx(Path::new("a/b.json")));
        assert!(!is_onnx(Path::new("a/onnx")));
    }
}
