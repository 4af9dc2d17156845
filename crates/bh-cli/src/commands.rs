use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use bh_service::ServiceConfig;
use bh_types::{Block, Extension, Multihash};
use colored::Colorize;
use serde::Serialize;
use tokio::io::AsyncWriteExt;

use crate::cli::*;
use crate::repo::{Repo, RepoConfig};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(&cli.repo, args, format).await,
        Command::Put(args) => cmd_put(&cli.repo, args, format).await,
        Command::Get(args) => cmd_get(&cli.repo, args, format).await,
        Command::Rm(args) => cmd_rm(&cli.repo, args, format).await,
        Command::Has(args) => cmd_has(&cli.repo, args, format).await,
        Command::Config => cmd_config(&cli.repo, format).await,
    }
}

#[derive(Debug, Serialize)]
struct PutSummary {
    file: PathBuf,
    key: Multihash,
    extension: String,
    size: usize,
}

#[derive(Debug, Serialize)]
struct HasSummary {
    key: Multihash,
    extension: String,
    present: bool,
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_key(hash: &str) -> anyhow::Result<Multihash> {
    hash.parse()
        .with_context(|| format!("invalid block hash {hash:?}"))
}

async fn cmd_init(root: &Path, args: InitArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut service = ServiceConfig::default();
    if let Some(n) = args.max_concurrency {
        service.max_concurrency = n;
    }
    let default_extension = args.default_ext.map(Extension::new).transpose()?;
    let repo = Repo::init(root, RepoConfig { default_extension, service }).await?;

    match format {
        OutputFormat::Json => print_json(repo.config()),
        OutputFormat::Text => {
            println!(
                "{} Initialized block repository in {}",
                "✓".green().bold(),
                repo.root().display().to_string().bold()
            );
            Ok(())
        }
    }
}

/// Read every file and store it as one batch.
async fn put_files(
    repo: &Repo,
    files: &[PathBuf],
    extension: Option<Extension>,
) -> anyhow::Result<Vec<PutSummary>> {
    let mut blocks = Vec::with_capacity(files.len());
    for file in files {
        let data = tokio::fs::read(file)
            .await
            .with_context(|| format!("reading {}", file.display()))?;
        blocks.push(Block::with_extension(data, extension.clone()));
    }

    let summaries = files
        .iter()
        .zip(&blocks)
        .map(|(file, block)| PutSummary {
            file: file.clone(),
            key: block.key().clone(),
            extension: Extension::resolve(block.extension()).to_string(),
            size: block.len(),
        })
        .collect();
    repo.service().add_blocks(blocks).await?;
    Ok(summaries)
}

async fn cmd_put(root: &Path, args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = Repo::open(root).await?;
    let extension = repo.extension(args.ext.as_deref())?;
    let summaries = put_files(&repo, &args.files, extension).await?;

    match format {
        OutputFormat::Json => print_json(&summaries),
        OutputFormat::Text => {
            for s in &summaries {
                println!(
                    "{} {}  {} ({} bytes, {})",
                    "stored".green(),
                    s.key.to_string().yellow(),
                    s.file.display(),
                    s.size,
                    s.extension.cyan()
                );
            }
            Ok(())
        }
    }
}

async fn cmd_get(root: &Path, args: GetArgs, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json && args.output.is_none() {
        bail!("--format json needs --output; the payload would otherwise share stdout");
    }
    let repo = Repo::open(root).await?;
    let key = parse_key(&args.hash)?;
    let extension = repo.extension(args.ext.as_deref())?;
    let block = repo.service().get_block(&key, extension.as_ref()).await?;

    let Some(path) = args.output else {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(block.data()).await?;
        stdout.flush().await?;
        return Ok(());
    };

    tokio::fs::write(&path, block.data())
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    match format {
        OutputFormat::Json => print_json(&PutSummary {
            file: path,
            key,
            extension: Extension::resolve(block.extension()).to_string(),
            size: block.len(),
        }),
        OutputFormat::Text => {
            println!(
                "{} {} → {} ({} bytes)",
                "fetched".green(),
                key.to_string().yellow(),
                path.display(),
                block.len()
            );
            Ok(())
        }
    }
}

async fn cmd_rm(root: &Path, args: RmArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = Repo::open(root).await?;
    let extension = repo.extension(args.ext.as_deref())?;
    let keys = args
        .hashes
        .iter()
        .map(|h| parse_key(h))
        .collect::<anyhow::Result<Vec<_>>>()?;
    repo.service()
        .delete_blocks(keys.clone(), extension.as_ref())
        .await?;

    match format {
        OutputFormat::Json => print_json(&keys),
        OutputFormat::Text => {
            for key in &keys {
                println!("{} {}", "removed".red(), key.to_string().yellow());
            }
            Ok(())
        }
    }
}

async fn cmd_has(root: &Path, args: HasArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = Repo::open(root).await?;
    let key = parse_key(&args.hash)?;
    let extension = repo.extension(args.ext.as_deref())?;
    let present = repo.service().has_block(&key, extension.as_ref()).await?;

    let summary = HasSummary {
        key,
        extension: Extension::resolve(extension.as_ref()).to_string(),
        present,
    };
    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Text => {
            let mark = if present { "yes".green() } else { "no".red() };
            println!("{} {} ({})", mark, summary.key.to_string().yellow(), summary.extension);
            Ok(())
        }
    }
}

async fn cmd_config(root: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let repo = Repo::open(root).await?;
    match format {
        OutputFormat::Json => print_json(repo.config()),
        OutputFormat::Text => {
            print!("{}", toml::to_string_pretty(repo.config())?);
            Ok(())
        }
    }
}
