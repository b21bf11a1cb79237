use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use toolsmith_engine::checksum::verify_and_record;
use toolsmith_engine::installer::{BinaryInstaller, BinaryPluginConfig};

use crate::context::EngineContext;
use crate::error::Result;
use crate::plugin::{select_latest, Help, Plugin, PluginMeta};

/// A tool shipped as one prebuilt executable per platform.
pub struct BinaryPlugin {
    config: BinaryPluginConfig,
    meta: PluginMeta,
    ctx: EngineContext,
}

impl BinaryPlugin {
    pub fn new(config: BinaryPluginConfig, meta: PluginMeta, ctx: EngineContext) -> Self {
        Self { config, meta, ctx }
    }

    pub fn config(&self) -> &BinaryPluginConfig {
        &self.config
    }

    fn installer(&self) -> BinaryInstaller<'_> {
        BinaryInstaller::new(&self.config, &self.ctx.fetcher, &self.ctx.host)
    }
}

#[async_trait]
impl Plugin for BinaryPlugin {
    fn name(&self) -> &str {
        &self.config.name
    }

    async fn list_all(&self) -> Result<Vec<String>> {
        let versions = self
            .config
            .version_source
            .list(
                self.ctx.versions.as_ref(),
                &self.ctx.fetcher,
                &self.config.repo_url(),
                &self.config.tag_prefix,
            )
            .await?;
        Ok(versions)
    }

    async fn download(&self, version: &str, download_dir: &Path) -> Result<()> {
        self.installer().download(version, download_dir).await?;
        verify_and_record(&self.ctx.ledger, &self.config.name, version, download_dir)?;
        Ok(())
    }

    async fn install(&self, version: &str, download_dir: &Path, install_dir: &Path) -> Result<()> {
        self.download(version, download_dir).await?;
        self.installer()
            .install(version, download_dir, install_dir)
            .await?;
        Ok(())
    }

    async fn latest_stable(&self, query: &str) -> Result<String> {
        let versions = self.list_all().await?;
        select_latest(&versions, query, self.meta.latest_policy)
    }

    fn list_bin_paths(&self) -> String {
        self.meta.bin_paths.clone()
    }

    fn exec_env(&self, install_dir: &Path) -> BTreeMap<String, String> {
        self.meta.render_exec_env(install_dir)
    }

    fn list_legacy_filenames(&self) -> Vec<String> {
        self.meta.legacy_filenames.clone()
    }

    fn help(&self) -> Help {
        self.meta.help.clone()
    }
}
