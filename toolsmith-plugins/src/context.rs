use std::sync::Arc;

use toolsmith_engine::checksum::ChecksumLedger;
use toolsmith_engine::config::EngineConfig;
use toolsmith_engine::fetch::{build_client, Fetcher};
use toolsmith_engine::platform::HostPlatform;
use toolsmith_engine::version_source::{GitHubVersionSource, VersionSource};

use crate::error::Result;

/// Collaborators shared by every plugin instance.
#[derive(Clone)]
pub struct EngineContext {
    pub fetcher: Fetcher,
    pub versions: Arc<dyn VersionSource>,
    pub ledger: ChecksumLedger,
    pub host: HostPlatform,
}

impl EngineContext {
    pub fn new(
        fetcher: Fetcher,
        versions: Arc<dyn VersionSource>,
        ledger: ChecksumLedger,
        host: HostPlatform,
    ) -> Self {
        Self {
            fetcher,
            versions,
            ledger,
            host,
        }
    }

    /// Wire up the download client, the GitHub source, the ledger under the data
    /// root and the detected host.
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let client = build_client(&config.http)?;
        let versions =
            GitHubVersionSource::new(config.github.api_url.clone(), config.github.token());
        let ledger = ChecksumLedger::new(config.layout().ledger_path());

        Ok(Self::new(
            Fetcher::new(client),
            Arc::new(versions),
            ledger,
            HostPlatform::detect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_config_places_ledger_under_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            data_dir: Some(PathBuf::from(dir.path())),
            ..Default::default()
        };
        // The environment override wins when set, so only check the file name.
        let ctx = EngineContext::from_config(&config).unwrap();
        assert!(ctx.ledger.path().ends_with(".tool-sums"));
        assert!(!ctx.host.arch.is_empty());
    }
}
