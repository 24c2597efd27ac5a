use std::path::{Path, PathBuf};
use std::sync::Arc;

use latport_core::{
    base_name, config_path_for, find_program, BackendError, CompiledArtifact, Compiler,
    CompilerOptions, InputShapeSpec, Result, RunError, ToolCommand, ToolRunner,
};
use tracing::{debug, info};

/// Extension of DeepX compiled models.
pub const DXNN_EXT: &str = "dxnn";

/// Compiles ONNX models with the DeepX `dx_com` toolchain.
///
/// `dx_com` reads input shapes from the sibling `<base>.json` config, so the
/// `input_shape` argument of [`Compiler::compile`] is ignored.
pub struct DxCom {
    options: CompilerOptions,
    runner: Arc<dyn ToolRunner>,
}

impl DxCom {
    pub fn new(options: CompilerOptions, runner: Arc<dyn ToolRunner>) -> Self {
        Self { options, runner }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// `dx_com -m <model> -c <config> -o <output_dir> <optimization flag> [extra..]`
    pub fn command(&self, model_path: &Path, config_path: &Path, output_dir: &Path) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.options.toolchain_path)
            .flag("-m", model_path)
            .flag("-c", config_path)
            .flag("-o", output_dir);
        if !self.options.optimization_flag.is_empty() {
            cmd = cmd.arg(&self.options.optimization_flag);
        }
        cmd.args(&self.options.extra_args)
    }

    pub fn compiled_path(output_dir: &Path, name: &str) -> PathBuf {
        output_dir.join(format!("{name}.{DXNN_EXT}"))
    }

    fn toolchain_error(name: &str, err: RunError) -> BackendError {
        BackendError::ToolchainExecution {
            model: name.to_string(),
            code: None,
            stderr: err.to_string(),
        }
    }
}

impl Compiler for DxCom {
    fn name(&self) -> &'static str {
        "dx_com"
    }

    fn compile(
        &self,
        model_path: &Path,
        save_path: &Path,
        _input_shape: Option<&InputShapeSpec>,
    ) -> Result<CompiledArtifact> {
        if !model_path.is_file() {
            return Err(BackendError::MissingModel(model_path.to_path_buf()));
        }
        let config_path = config_path_for(model_path);
        if !config_path.is_file() {
            return Err(BackendError::MissingConfig(config_path));
        }

        let name = base_name(model_path);
        let output_dir = save_path.join(&name);
        std::fs::create_dir_all(&output_dir).map_err(|e| BackendError::io(&output_dir, e))?;

        let cmd = self.command(model_path, &config_path, &output_dir);
        debug!(model = %name, command = %cmd.display(), "invoking dx_com");
        let output = self
            .runner
            .run(&cmd, self.options.timeout())
            .map_err(|e| Self::toolchain_error(&name, e))?;
        if !output.stdout.is_empty() {
            debug!(model = %name, stdout = %output.stdout.trim_end(), "dx_com output");
        }
        if !output.success() {
            return Err(BackendError::ToolchainExecution {
                model: name,
                code: output.code,
                stderr: output.stderr,
            });
        }

        let path = Self::compiled_path(&output_dir, &name);
        if !path.is_file() {
            return Err(BackendError::MissingOutput(path));
        }

        info!(model = %name, artifact = %path.display(), "compiled");
        Ok(CompiledArtifact {
            name,
            output_dir,
            path,
            source: model_path.to_path_buf(),
        })
    }

    fn check(&self) -> bool {
        let toolchain = &self.options.toolchain_path;
        let found = find_program(toolchain).is_some();
        if !found {
            debug!(toolchain = %toolchain.display(), "dx_com not found");
        }
        found
    }
}
