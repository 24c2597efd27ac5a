use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "latport", version, about = "Compile and profile models on hardware backends")]
pub struct Cli {
    /// Log level (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// Backend configuration (YAML); defaults apply when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory that receives one output directory per model
    #[arg(long)]
    pub save: PathBuf,

    /// Metric to report; repeatable
    #[arg(long = "metric", default_value = "latency")]
    pub metrics: Vec<String>,

    /// Override the configured number of trials
    #[arg(long)]
    pub trials: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write a compile config next to every ONNX model in a directory
    Configs {
        onnx_dir: PathBuf,
    },

    /// Compile and profile a single model
    Profile {
        /// Path to the ONNX model
        #[arg(long)]
        model: PathBuf,

        #[command(flatten)]
        args: ProfileArgs,
    },

    /// Compile and profile every ONNX model in a directory
    Batch {
        /// Directory holding the ONNX models
        #[arg(long)]
        models: PathBuf,

        /// Where to write the aggregated JSON results
        #[arg(long)]
        results: PathBuf,

        /// Regenerate compile configs before profiling
        #[arg(long)]
        gen_configs: bool,

        #[command(flatten)]
        args: ProfileArgs,
    },

    /// Check that the toolchain and device are reachable
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
