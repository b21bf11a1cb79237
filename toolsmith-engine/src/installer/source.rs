//! Build-from-source strategy: fetch a source archive, extract it, run the
//! caller's build hooks and check that the declared artifacts exist.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use anyhow::Context;

use crate::archive::{ArchiveType, Extractor};
use crate::error::{Error, HookStage, Result};
use crate::fetch::Fetcher;
use crate::installer::SCRATCH_PREFIX;
use crate::template::TemplateVars;
use crate::utils;
use crate::version_source::VersionSourceConfig;

/// Exported to [`command_hook`] processes.
pub const INSTALL_PATH_ENV: &str = "TOOLSMITH_INSTALL_PATH";
pub const VERSION_ENV: &str = "TOOLSMITH_VERSION";

/// What a build hook gets to work with.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub version: &'a str,
    pub source_dir: &'a Path,
    pub install_path: &'a Path,
}

pub type HookFn = Arc<dyn Fn(&BuildContext<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Computes the source URL for a version at install time.
pub type UrlResolverFn = Arc<dyn Fn(&str) -> anyhow::Result<String> + Send + Sync>;

#[derive(Clone)]
pub enum SourceUrl {
    /// Rendered with `{name}`, `{version}`, `{owner}`, `{repo}`, `{filename}`.
    Template(String),
    Resolver(UrlResolverFn),
}

impl fmt::Debug for SourceUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Self::Resolver(_) => write!(f, "Resolver(..)"),
        }
    }
}

/// Where the sources end up inside the extracted tree.
#[derive(Debug, Clone)]
pub enum SourceDir {
    /// Rendered like [`SourceUrl::Template`], relative to the extraction root.
    Template(String),
    /// The single top-level entry of the archive.
    AutoDetect,
}

#[derive(Clone)]
pub struct SourceBuildPluginConfig {
    pub name: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub version_source: VersionSourceConfig,
    pub tag_prefix: String,
    pub source_url: SourceUrl,
    /// `tar.gz`, `tar.xz` or `zip`.
    pub archive_type: String,
    pub source_dir: SourceDir,
    pub pre_build: Option<HookFn>,
    pub build: Option<HookFn>,
    pub post_install: Option<HookFn>,
    /// Paths relative to the install directory that a finished install has.
    pub expected_artifacts: Vec<String>,
}

impl fmt::Debug for SourceBuildPluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceBuildPluginConfig")
            .field("name", &self.name)
            .field("repo_owner", &self.repo_owner)
            .field("repo_name", &self.repo_name)
            .field("version_source", &self.version_source)
            .field("tag_prefix", &self.tag_prefix)
            .field("source_url", &self.source_url)
            .field("archive_type", &self.archive_type)
            .field("source_dir", &self.source_dir)
            .field("pre_build", &self.pre_build.is_some())
            .field("build", &self.build.is_some())
            .field("post_install", &self.post_install.is_some())
            .field("expected_artifacts", &self.expected_artifacts)
            .finish()
    }
}

impl SourceBuildPluginConfig {
    /// GitHub tag tarball defaults for `owner/repo`. No hooks are set.
    pub fn new(name: &str, repo_owner: &str, repo_name: &str) -> Self {
        Self {
            name: name.to_string(),
            repo_owner: repo_owner.to_string(),
            repo_name: repo_name.to_string(),
            version_source: VersionSourceConfig::GitHubTags,
            tag_prefix: "v".to_string(),
            source_url: SourceUrl::Template(
                "https://github.com/{owner}/{repo}/archive/refs/tags/v{version}.tar.gz".to_string(),
            ),
            archive_type: "tar.gz".to_string(),
            source_dir: SourceDir::AutoDetect,
            pre_build: None,
            build: None,
            post_install: None,
            expected_artifacts: Vec::new(),
        }
    }

    pub fn repo_url(&self) -> String {
        format!("{}/{}", self.repo_owner, self.repo_name)
    }
}

/// Run `program args..` inside the source directory.
///
/// The install path and version are exported as [`INSTALL_PATH_ENV`] and
/// [`VERSION_ENV`]. A non-zero exit status is an error.
pub fn command_hook(program: &str, args: &[&str]) -> HookFn {
    let program = program.to_string();
    let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();

    Arc::new(move |ctx: &BuildContext<'_>| -> anyhow::Result<()> {
        tracing::debug!("Running {} {:?} in {}", program, args, ctx.source_dir.display());
        let status = Command::new(&program)
            .args(&args)
            .current_dir(ctx.source_dir)
            .env(INSTALL_PATH_ENV, ctx.install_path)
            .env(VERSION_ENV, ctx.version)
            .status()
            .with_context(|| format!("failed to start `{program}`"))?;

        if !status.success() {
            anyhow::bail!("`{} {}` exited with {}", program, args.join(" "), status);
        }
        Ok(())
    })
}

pub struct SourceBuildInstaller<'a> {
    config: &'a SourceBuildPluginConfig,
    fetcher: &'a Fetcher,
}

impl<'a> SourceBuildInstaller<'a> {
    pub fn new(config: &'a SourceBuildPluginConfig, fetcher: &'a Fetcher) -> Self {
        Self { config, fetcher }
    }

    fn archive_type(&self) -> Result<ArchiveType> {
        match self.config.archive_type.parse::<ArchiveType>()? {
            ArchiveType::Gz => Err(Error::UnsupportedArchiveType {
                archive_type: self.config.archive_type.clone(),
            }),
            archive_type => Ok(archive_type),
        }
    }

    /// Local file name of the source archive.
    pub fn archive_filename(&self, version: &str) -> Result<String> {
        let archive_type = self.archive_type()?;
        Ok(format!("{}-{}.{}", self.config.name, version, archive_type.extension()))
    }

    pub fn source_url(&self, version: &str) -> Result<String> {
        match &self.config.source_url {
            SourceUrl::Template(template) => {
                let filename = self.archive_filename(version)?;
                Ok(self.vars(version, &filename).render(template))
            }
            SourceUrl::Resolver(resolve) => resolve(version).map_err(|source| Error::Hook {
                stage: HookStage::UrlResolver,
                source,
            }),
        }
    }

    fn vars<'v>(&'v self, version: &'v str, filename: &'v str) -> TemplateVars<'v> {
        TemplateVars {
            name: &self.config.name,
            version,
            filename,
            owner: &self.config.repo_owner,
            repo: &self.config.repo_name,
            ..Default::default()
        }
    }

    /// True when every expected artifact already exists.
    ///
    /// A config without expected artifacts is never considered installed.
    pub fn is_installed(&self, install_dir: &Path) -> bool {
        !self.config.expected_artifacts.is_empty()
            && self
                .config
                .expected_artifacts
                .iter()
                .all(|artifact| install_dir.join(artifact).exists())
    }

    /// Fetch the source archive unless a non-empty copy is already present.
    pub async fn download(&self, version: &str, download_dir: &Path) -> Result<PathBuf> {
        let dest = download_dir.join(self.archive_filename(version)?);
        if utils::is_plausible_file(&dest, 0) {
            tracing::info!("Using cached source archive {}", dest.display());
            return Ok(dest);
        }

        let url = self.source_url(version)?;
        tracing::info!("Downloading {} {} sources", self.config.name, version);
        self.fetcher.download_file(&url, &dest).await?;
        Ok(dest)
    }

    pub async fn install(&self, version: &str, download_dir: &Path, install_dir: &Path) -> Result<()> {
        let name = &self.config.name;
        if self.is_installed(install_dir) {
            tracing::info!("{} {} already installed at {}", name, version, install_dir.display());
            return Ok(());
        }

        let archive_type = self.archive_type()?;
        let build = self
            .config
            .build
            .as_ref()
            .ok_or_else(|| Error::MissingBuildStep { tool: name.clone() })?;

        let archive = self.download(version, download_dir).await?;

        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(download_dir)?;
        tracing::info!("Extracting {} to {}", archive.display(), scratch.path().display());
        Extractor::default().extract(archive_type, &archive, scratch.path())?;

        let source_dir = self.resolve_source_dir(version, scratch.path())?;
        fs::create_dir_all(install_dir)?;

        let ctx = BuildContext {
            version,
            source_dir: &source_dir,
            install_path: install_dir,
        };
        run_hook(self.config.pre_build.as_ref(), HookStage::PreBuild, &ctx)?;
        run_hook(Some(build), HookStage::Build, &ctx)?;
        run_hook(self.config.post_install.as_ref(), HookStage::PostInstall, &ctx)?;

        for artifact in &self.config.expected_artifacts {
            let path = install_dir.join(artifact);
            if !path.exists() {
                return Err(Error::ArtifactMissing {
                    path: path.display().to_string(),
                });
            }
        }

        tracing::info!("Installed {} {} to {}", name, version, install_dir.display());
        Ok(())
    }

    fn resolve_source_dir(&self, version: &str, root: &Path) -> Result<PathBuf> {
        let dir = match &self.config.source_dir {
            SourceDir::Template(template) => root.join(self.vars(version, "").render(template)),
            SourceDir::AutoDetect => {
                let entries = fs::read_dir(root)?.collect::<std::io::Result<Vec<_>>>()?;
                match entries.as_slice() {
                    [only] if only.path().is_dir() => only.path(),
                    _ => {
                        return Err(Error::SourceDirMissing {
                            path: format!(
                                "{} (expected one top-level directory, found {} entries)",
                                root.display(),
                                entries.len()
                            ),
                        })
                    }
                }
            }
        };

        if !dir.is_dir() {
            return Err(Error::SourceDirMissing {
                path: dir.display().to_string(),
            });
        }
        Ok(dir)
    }
}

fn run_hook(hook: Option<&HookFn>, stage: HookStage, ctx: &BuildContext<'_>) -> Result<()> {
    let Some(hook) = hook else {
        return Ok(());
    };
    tracing::debug!("Running {} hook for {}", stage, ctx.version);
    hook(ctx).map_err(|source| Error::Hook { stage, source })
}
