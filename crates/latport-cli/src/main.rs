mod cli;
mod driver;
mod registry;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Cli, Command, ProfileArgs};
use latport_core::ProfileOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

// Not async: `SystemRunner` owns a runtime and cannot run inside another one.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Command::Configs { onnx_dir } => {
            let written = latport_onnx::write_configs(&onnx_dir)?;
            println!("generated {} compile configs in {}", written.len(), onnx_dir.display());
        }
        Command::Profile { model, args } => {
            let config = registry::load_config(args.config.as_deref())?;
            let backend = registry::build_backend(&config)?;
            let metrics = metric_names(&args);
            let result = backend
                .profile_model_file(&model, &args.save, &metrics, &options(&args))
                .with_context(|| format!("failed to profile {}", model.display()))?;
            println!("{}", serde_json::to_string_pretty(&result.metrics)?);
        }
        Command::Batch {
            models,
            results,
            gen_configs,
            args,
        } => {
            let config = registry::load_config(args.config.as_deref())?;
            let backend = registry::build_backend(&config)?;
            let metrics = metric_names(&args);
            let report = driver::profile_dir(
                backend.as_ref(),
                &models,
                &args.save,
                &metrics,
                &options(&args),
                gen_configs,
            )?;
            report.write(&results)?;
            info!(
                succeeded = report.succeeded(),
                failed = report.failed,
                results = %results.display(),
                "batch finished"
            );
        }
        Command::Check { config } => {
            let config = registry::load_config(config.as_deref())?;
            let backend = registry::build_backend(&config)?;
            if !backend.test_connection() {
                bail!("backend {} is not reachable", backend.name());
            }
            println!("{}: OK", backend.name());
        }
    }

    Ok(())
}

fn metric_names(args: &ProfileArgs) -> Vec<&str> {
    args.metrics.iter().map(String::as_str).collect()
}

fn options(args: &ProfileArgs) -> ProfileOptions {
    ProfileOptions {
        input_shape: None,
        trials: args.trials,
    }
}
