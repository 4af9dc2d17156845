use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use bh_exchange::OfflineExchange;
use bh_service::{BlockService, ServiceConfig};
use bh_store::FsBlockStore;
use bh_types::Extension;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE: &str = "config.toml";
pub const BLOCKS_DIR: &str = "blocks";

/// The CLI has no network, so the exchange seam is filled with an offline one.
pub type RepoService = BlockService<FsBlockStore, OfflineExchange>;

/// Contents of `<repo>/config.toml`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    /// Extension used when a command is not given `--ext`.
    pub default_extension: Option<Extension>,
    pub service: ServiceConfig,
}

/// An on-disk block repository: a config file plus a filesystem block store.
pub struct Repo {
    root: PathBuf,
    config: RepoConfig,
    service: RepoService,
}

impl Repo {
    /// Create the repository layout and write its config.
    pub async fn init(root: &Path, config: RepoConfig) -> anyhow::Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        if tokio::fs::try_exists(&config_path).await? {
            bail!("repository already initialized at {}", root.display());
        }
        config.service.validate()?;
        tokio::fs::create_dir_all(root.join(BLOCKS_DIR))
            .await
            .with_context(|| format!("creating {}", root.display()))?;
        let text = toml::to_string_pretty(&config).context("encoding config")?;
        tokio::fs::write(&config_path, text)
            .await
            .with_context(|| format!("writing {}", config_path.display()))?;
        Self::open(root).await
    }

    /// Open an existing repository.
    pub async fn open(root: &Path) -> anyhow::Result<Self> {
        let config_path = root.join(CONFIG_FILE);
        let text = tokio::fs::read_to_string(&config_path).await.with_context(|| {
            format!(
                "no repository at {} (run `blockhouse init` first)",
                root.display()
            )
        })?;
        let config: RepoConfig = toml::from_str(&text)
            .with_context(|| format!("parsing {}", config_path.display()))?;
        config
            .service
            .validate()
            .with_context(|| format!("invalid {}", config_path.display()))?;
        debug!(root = %root.display(), ?config, "repository opened");

        let store = FsBlockStore::open(root.join(BLOCKS_DIR)).await?;
        let service = BlockService::with_config(
            Arc::new(store),
            Arc::new(OfflineExchange),
            config.service.clone(),
        );
        Ok(Self {
            root: root.to_path_buf(),
            config,
            service,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn service(&self) -> &RepoService {
        &self.service
    }

    /// The extension a command should use: the flag if given, else the
    /// repository default.
    pub fn extension(&self, flag: Option<&str>) -> anyhow::Result<Option<Extension>> {
        match flag {
            Some(tag) => Ok(Some(Extension::new(tag)?)),
            None => Ok(self.config.default_extension.clone()),
        }
    }
}
