//! Prebuilt binary strategy: fetch one release artifact and place a single
//! executable at `<install>/bin/<binary>`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveType, Extractor};
use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::installer::SCRATCH_PREFIX;
use crate::platform::{HostPlatform, PlatformMap};
use crate::template::TemplateVars;
use crate::utils;
use crate::version_source::VersionSourceConfig;

/// Cached artifacts at or below this size are treated as stale leftovers.
pub const MIN_CACHED_SIZE: u64 = 512;

#[derive(Debug, Clone)]
pub struct BinaryPluginConfig {
    pub name: String,
    pub repo_owner: String,
    pub repo_name: String,
    /// File name of the executable inside the archive and under `bin/`.
    pub binary_name: String,
    pub version_source: VersionSourceConfig,
    /// Stripped from tags before they are treated as versions.
    pub tag_prefix: String,
    pub filename_template: String,
    pub download_url_template: String,
    /// `<hex>  <filename>` manifest checked after a fresh download.
    pub checksum_url_template: Option<String>,
    /// `tar.gz`, `tar.xz`, `zip` or `gz`. Anything else means the download
    /// is the binary itself.
    pub archive_type: String,
    pub platform_map: Option<PlatformMap>,
    pub arch_map: Option<PlatformMap>,
}

impl BinaryPluginConfig {
    /// GitHub release defaults for `owner/repo`; adjust fields as needed.
    pub fn new(name: &str, repo_owner: &str, repo_name: &str) -> Self {
        Self {
            name: name.to_string(),
            repo_owner: repo_owner.to_string(),
            repo_name: repo_name.to_string(),
            binary_name: name.to_string(),
            version_source: VersionSourceConfig::GitHubTags,
            tag_prefix: "v".to_string(),
            filename_template: "{name}_{version}_{platform}_{arch}.tar.gz".to_string(),
            download_url_template:
                "https://github.com/{owner}/{repo}/releases/download/v{version}/{filename}"
                    .to_string(),
            checksum_url_template: None,
            archive_type: "tar.gz".to_string(),
            platform_map: None,
            arch_map: None,
        }
    }

    pub fn repo_url(&self) -> String {
        format!("{}/{}", self.repo_owner, self.repo_name)
    }
}

/// Resolved names for one version on the current host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryArtifact {
    pub platform: String,
    pub arch: String,
    pub filename: String,
    pub url: String,
}

pub struct BinaryInstaller<'a> {
    config: &'a BinaryPluginConfig,
    fetcher: &'a Fetcher,
    host: &'a HostPlatform,
}

impl<'a> BinaryInstaller<'a> {
    pub fn new(config: &'a BinaryPluginConfig, fetcher: &'a Fetcher, host: &'a HostPlatform) -> Self {
        Self {
            config,
            fetcher,
            host,
        }
    }

    /// Map the host through the configured tables and render names.
    pub fn artifact(&self, version: &str) -> Result<BinaryArtifact> {
        let config = self.config;
        let platform = self
            .host
            .resolve_os(&config.name, config.platform_map.as_ref())?;
        let arch = self
            .host
            .resolve_arch(&config.name, config.arch_map.as_ref())?;

        let mut vars = TemplateVars {
            name: &config.name,
            version,
            platform: &platform,
            arch: &arch,
            owner: &config.repo_owner,
            repo: &config.repo_name,
            ..Default::default()
        };
        let filename = vars.render(&config.filename_template);
        vars.filename = &filename;
        let url = vars.render(&config.download_url_template);

        Ok(BinaryArtifact {
            platform,
            arch,
            filename,
            url,
        })
    }

    /// Fetch the artifact into `download_dir` unless a plausible copy exists.
    ///
    /// A cached copy is checked against the checksum manifest like a fresh
    /// one; if it no longer matches it is downloaded again.
    pub async fn download(&self, version: &str, download_dir: &Path) -> Result<PathBuf> {
        let artifact = self.artifact(version)?;
        let dest = download_dir.join(&artifact.filename);

        if utils::is_plausible_file(&dest, MIN_CACHED_SIZE) {
            tracing::info!("Using cached {} for {} {}", dest.display(), self.config.name, version);
            match self.check_manifest(version, &artifact, &dest).await {
                Err(Error::ChecksumVerification { .. }) => {
                    tracing::warn!(
                        "Cached {} does not match its checksum manifest, downloading again",
                        dest.display()
                    );
                }
                other => return other.map(|()| dest),
            }
        }

        tracing::info!(
            "Downloading {} {} for {}/{}",
            self.config.name,
            version,
            artifact.platform,
            artifact.arch
        );
        self.fetcher.download_file(&artifact.url, &dest).await?;
        self.check_manifest(version, &artifact, &dest).await?;
        Ok(dest)
    }

    async fn check_manifest(
        &self,
        version: &str,
        artifact: &BinaryArtifact,
        file: &Path,
    ) -> Result<()> {
        match &self.config.checksum_url_template {
            Some(template) => self.verify_manifest(template, version, artifact, file).await,
            None => Ok(()),
        }
    }

    async fn verify_manifest(
        &self,
        template: &str,
        version: &str,
        artifact: &BinaryArtifact,
        file: &Path,
    ) -> Result<()> {
        let url = TemplateVars {
            name: &self.config.name,
            version,
            platform: &artifact.platform,
            arch: &artifact.arch,
            filename: &artifact.filename,
            owner: &self.config.repo_owner,
            repo: &self.config.repo_name,
        }
        .render(template);

        let manifest = match self.fetcher.download_string(&url).await {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::warn!(
                    "Could not fetch checksum manifest {}: {}. Continuing without verification",
                    url,
                    e
                );
                return Ok(());
            }
        };

        let expected =
            parse_checksum(&manifest, &artifact.filename).ok_or_else(|| Error::ChecksumNotListed {
                file: artifact.filename.clone(),
                url: url.clone(),
            })?;
        let actual = utils::calculate_sha256(file)?;

        if !actual.eq_ignore_ascii_case(&expected) {
            tracing::error!(
                "Checksum mismatch for {}: expected {}, got {}",
                artifact.filename,
                expected,
                actual
            );
            return Err(Error::ChecksumVerification {
                file: artifact.filename.clone(),
                expected,
                actual,
            });
        }

        tracing::info!("Checksum verified successfully for {}", artifact.filename);
        Ok(())
    }

    /// Place the executable at `<install_dir>/bin/<binary_name>`.
    pub async fn install(
        &self,
        version: &str,
        download_dir: &Path,
        install_dir: &Path,
    ) -> Result<PathBuf> {
        let archive = self.download(version, download_dir).await?;

        let bin_dir = install_dir.join("bin");
        fs::create_dir_all(&bin_dir)?;
        let dest = bin_dir.join(&self.config.binary_name);

        match self.config.archive_type.parse::<ArchiveType>().ok() {
            Some(ArchiveType::Gz) => {
                Extractor::default().extract_gz(&archive, &dest)?;
            }
            Some(archive_type) => {
                let scratch = tempfile::Builder::new()
                    .prefix(SCRATCH_PREFIX)
                    .tempdir_in(download_dir)?;
                Extractor::default().extract(archive_type, &archive, scratch.path())?;

                let found = utils::find_file_named(scratch.path(), &self.config.binary_name)?
                    .ok_or_else(|| Error::BinaryNotFound {
                        name: self.config.binary_name.clone(),
                        archive: archive.display().to_string(),
                    })?;
                fs::copy(&found, &dest)?;
            }
            None => {
                fs::copy(&archive, &dest)?;
            }
        }

        utils::make_executable(&dest)?;
        tracing::info!("Installed {} {} to {}", self.config.name, version, dest.display());
        Ok(dest)
    }
}

/// Find the digest for `filename` in a `<hex>  <filename>` manifest.
///
/// Entries may carry a directory prefix (`./dist/name`) or the binary-mode
/// marker (`*name`).
pub fn parse_checksum(content: &str, filename: &str) -> Option<String> {
    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            let checksum = parts[0];
            let file = parts[1..].join(" ");
            let file = file.trim_start_matches('*');

            if file == filename || file.ends_with(&format!("/{filename}")) {
                return Some(checksum.to_string());
            }
        }
    }
    None
}
