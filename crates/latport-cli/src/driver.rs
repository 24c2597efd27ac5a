//! Batch driver: profiles every model in a directory, one at a time.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use latport_core::{ModelArtifact, ProfileBackend, ProfileOptions};
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Base name to metric mapping, or `{"error": ...}` for failed models.
    pub results: BTreeMap<String, Value>,
    pub failed: usize,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.len() - self.failed
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(&self.results)?;
        std::fs::write(path, text + "\n")
            .with_context(|| format!("failed to write results: {}", path.display()))
    }
}

/// A failing model is recorded under its base name and does not stop the
/// remaining models. With `gen_configs`, each model's compile config is
/// regenerated right before it is profiled.
pub fn profile_dir(
    backend: &dyn ProfileBackend,
    models_dir: &Path,
    save_path: &Path,
    metrics: &[&str],
    opts: &ProfileOptions,
    gen_configs: bool,
) -> Result<BatchReport> {
    let models: Vec<ModelArtifact> = latport_onnx::onnx_files(models_dir)?
        .into_iter()
        .map(ModelArtifact::onnx)
        .collect();
    info!(count = models.len(), dir = %models_dir.display(), "profiling models");

    let mut report = BatchReport::default();
    for model in &models {
        let configured = if gen_configs {
            latport_onnx::write_config(model.path()).map(|_| ())
        } else {
            Ok(())
        };
        let outcome = configured
            .and_then(|()| backend.profile_model_file(model.path(), save_path, metrics, opts));
        let entry = match outcome {
            Ok(result) => json!(result.metrics),
            Err(err) => {
                warn!(model = model.name(), error = %err, "skipping model");
                report.failed += 1;
                json!({ "error": err.to_string() })
            }
        };
        report.results.insert(model.name().to_owned(), entry);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use latport_core::reference::reference_backend;

    #[test]
    fn failures_do_not_abort_batch() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["net_a", "net_b", "net_c"] {
            std::fs::write(dir.path().join(format!("{name}.onnx")), b"onnx").unwrap();
        }
        std::fs::write(dir.path().join("net_a.json"), b"{}").unwrap();
        std::fs::write(dir.path().join("net_c.json"), b"{}").unwrap();

        let backend = reference_backend();
        let report = profile_dir(
            &backend,
            dir.path(),
            &dir.path().join("out"),
            &["latency"],
            &ProfileOptions::default(),
            false,
        )
        .unwrap();

        assert_eq!(report.results.len(), 3);
        assert_eq!(report.failed, 1);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.results["net_a"], json!({}));
        let err = report.results["net_b"]["error"].as_str().unwrap();
        assert!(err.contains("compile config not found"));

        let out = dir.path().join("results/profiled.json");
        report.write(&out).unwrap();
        let back: Value = serde_json::from_str(&std::fs::read_to_string(out).unwrap()).unwrap();
        assert_eq!(back["net_c"], json!({}));
    }

    #[test]
    fn malformed_model_does_not_block_config_generation() {
        use latport_onnx::proto::{Dimension, GraphProto, ModelProto, ValueInfoProto};
        use prost::Message;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a_bad.onnx"), [0xff, 0xff, 0xff]).unwrap();
        let model = ModelProto {
            ir_version: 8,
            producer_name: "onnx".into(),
            graph: Some(GraphProto {
                name: "net_a".into(),
                input: vec![ValueInfoProto::tensor(
                    "x",
                    [1, 3, 224, 224].into_iter().map(Dimension::fixed).collect(),
                )],
                output: Vec::new(),
            }),
        };
        std::fs::write(dir.path().join("net_a.onnx"), model.encode_to_vec()).unwrap();

        let backend = reference_backend();
        let report = profile_dir(
            &backend,
            dir.path(),
            &dir.path().join("out"),
            &["latency"],
            &ProfileOptions::default(),
            true,
        )
        .unwrap();

        assert_eq!(report.failed, 1);
        let err = report.results["a_bad"]["error"].as_str().unwrap();
        assert!(err.contains("malformed model"));
        assert_eq!(report.results["net_a"], json!({}));
        assert!(dir.path().join("net_a.json").is_file());
        assert!(!dir.path().join("a_bad.json").exists());
    }
}
