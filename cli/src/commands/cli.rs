use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "taskweave", version, about = "Plan a request into tasks and execute them")]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file; defaults to ~/.taskweave/config.toml, then ./config.toml.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use a scripted oracle instead of the configured LLM.
    #[arg(long, global = true)]
    pub offline: bool,

    /// JSON array of canned oracle responses for `--offline`.
    #[arg(long, global = true, requires = "offline")]
    pub script: Option<PathBuf>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Decompose a request and print the plan without executing it.
    Plan(InputArgs),
    /// Plan (when needed) and execute a request.
    Run(RunArgs),
}

#[derive(ClapArgs, Debug, Clone)]
pub struct InputArgs {
    #[arg(long, group = "input")]
    pub prompt: Option<String>,

    #[arg(long, group = "input")]
    pub prompt_file: Option<PathBuf>,

    #[arg(long, group = "input")]
    pub stdin: bool,
}

#[derive(ClapArgs, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Run independent tasks of a wave concurrently.
    #[arg(long)]
    pub parallel: bool,

    #[arg(long)]
    pub max_workers: Option<usize>,

    /// Execute the request as a single task even if it looks decomposable.
    #[arg(long)]
    pub no_plan: bool,
}
