use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "blockhouse",
    about = "Blockhouse — content-addressed block storage",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Repository directory.
    #[arg(long, global = true, default_value = ".blockhouse")]
    pub repo: PathBuf,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new block repository
    Init(InitArgs),
    /// Store files as blocks
    Put(PutArgs),
    /// Read a block
    Get(GetArgs),
    /// Delete blocks
    Rm(RmArgs),
    /// Check whether a block is stored
    Has(HasArgs),
    /// Show the repository configuration
    Config,
}

#[derive(Args)]
pub struct InitArgs {
    /// Batch concurrency cap (0 = unbounded)
    #[arg(long)]
    pub max_concurrency: Option<usize>,
    /// Extension used when --ext is not given
    #[arg(long)]
    pub default_ext: Option<String>,
}

#[derive(Args)]
pub struct PutArgs {
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
    #[arg(long)]
    pub ext: Option<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub hash: String,
    #[arg(long)]
    pub ext: Option<String>,
    /// Write the payload here instead of stdout (required with --format json)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct RmArgs {
    #[arg(required = true)]
    pub hashes: Vec<String>,
    #[arg(long)]
    pub ext: Option<String>,
}

#[derive(Args)]
pub struct HasArgs {
    pub hash: String,
    #[arg(long)]
    pub ext: Option<String>,
}
