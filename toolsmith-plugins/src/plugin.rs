//! The contract every tool plugin implements.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use async_trait::async_trait;
use toolsmith_engine::version::{latest_stable_with_query, latest_version};

use crate::error::{PluginError, Result};

/// Help text sections shown for a tool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Help {
    pub overview: String,
    pub deps: String,
    pub config: String,
    pub links: String,
}

/// How `latest_stable` treats a query prefix that matches nothing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LatestPolicy {
    /// Fall back to the whole list.
    #[default]
    Lenient,
    /// Fail with `NoMatch`.
    Strict,
}

/// Everything about a plugin that is not the install strategy itself.
#[derive(Debug, Clone)]
pub struct PluginMeta {
    pub help: Help,
    pub legacy_filenames: Vec<String>,
    /// Values may contain `{install_dir}`.
    pub exec_env: BTreeMap<String, String>,
    /// Space separated, relative to the install directory.
    pub bin_paths: String,
    pub latest_policy: LatestPolicy,
}

impl Default for PluginMeta {
    fn default() -> Self {
        Self {
            help: Help::default(),
            legacy_filenames: Vec::new(),
            exec_env: BTreeMap::new(),
            bin_paths: "bin".to_string(),
            latest_policy: LatestPolicy::default(),
        }
    }
}

impl PluginMeta {
    pub fn render_exec_env(&self, install_dir: &Path) -> BTreeMap<String, String> {
        let install_dir = install_dir.display().to_string();
        self.exec_env
            .iter()
            .map(|(k, v)| (k.clone(), v.replace("{install_dir}", &install_dir)))
            .collect()
    }
}

#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> &str;

    /// All known versions, sorted ascending.
    async fn list_all(&self) -> Result<Vec<String>>;

    async fn download(&self, version: &str, download_dir: &Path) -> Result<()>;

    async fn install(&self, version: &str, download_dir: &Path, install_dir: &Path) -> Result<()>;

    /// Remove the install directory. Ledger entries are kept.
    async fn uninstall(&self, install_dir: &Path) -> Result<()> {
        match fs::remove_dir_all(install_dir) {
            Ok(()) => {
                tracing::info!("Removed {}", install_dir.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn latest_stable(&self, query: &str) -> Result<String>;

    fn list_bin_paths(&self) -> String {
        "bin".to_string()
    }

    fn exec_env(&self, _install_dir: &Path) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    fn list_legacy_filenames(&self) -> Vec<String> {
        Vec::new()
    }

    /// First token of the file, without a leading `v`.
    fn parse_legacy_file(&self, path: &Path) -> Result<String> {
        let content = fs::read_to_string(path)?;
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .find_map(|line| line.split_whitespace().next())
            .map(|token| token.strip_prefix('v').unwrap_or(token).to_string())
            .filter(|version| !version.is_empty())
            .ok_or_else(|| PluginError::EmptyVersionFile {
                path: path.display().to_string(),
            })
    }

    fn help(&self) -> Help {
        Help::default()
    }
}

/// Pick the latest version under `policy`.
pub fn select_latest(versions: &[String], query: &str, policy: LatestPolicy) -> Result<String> {
    match policy {
        LatestPolicy::Lenient => {
            let latest = latest_version(versions, query);
            if latest.is_empty() {
                return Err(toolsmith_engine::Error::NoVersions.into());
            }
            Ok(latest)
        }
        LatestPolicy::Strict => Ok(latest_stable_with_query(versions, query)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Bare;

    #[async_trait]
    impl Plugin for Bare {
        fn name(&self) -> &str {
            "bare"
        }

        async fn list_all(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn download(&self, _version: &str, _download_dir: &Path) -> Result<()> {
            Ok(())
        }

        async fn install(&self, _version: &str, _dl: &Path, _install_dir: &Path) -> Result<()> {
            Ok(())
        }

        async fn latest_stable(&self, _query: &str) -> Result<String> {
            Err(toolsmith_engine::Error::NoVersions.into())
        }
    }

    fn versions(list: &[&str]) -> Vec<String> {
        list.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_defaults() {
        let plugin = Bare;
        assert_eq!(plugin.list_bin_paths(), "bin");
        assert!(plugin.exec_env(Path::new("/x")).is_empty());
        assert!(plugin.list_legacy_filenames().is_empty());
        assert_eq!(plugin.help(), Help::default());
    }

    #[test]
    fn test_parse_legacy_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join(".nvmrc");

        fs::write(&file, "# pinned\n\n  v20.1.0 lts\n18.0.0\n").unwrap();
        assert_eq!(Bare.parse_legacy_file(&file).unwrap(), "20.1.0");

        fs::write(&file, "\n# nothing here\n").unwrap();
        assert!(matches!(
            Bare.parse_legacy_file(&file),
            Err(PluginError::EmptyVersionFile { .. })
        ));

        assert!(matches!(
            Bare.parse_legacy_file(&dir.path().join("missing")),
            Err(PluginError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_uninstall_removes_directory() {
        let dir = tempdir().unwrap();
        let install = dir.path().join("installs/bare/1.0.0");
        fs::create_dir_all(install.join("bin")).unwrap();
        fs::write(install.join("bin/bare"), b"x").unwrap();

        Bare.uninstall(&install).await.unwrap();
        assert!(!install.exists());
        Bare.uninstall(&install).await.unwrap();
    }

    #[test]
    fn test_select_latest_policies() {
        let list = versions(&["1.0.0", "1.1.0-rc1", "1.1.0"]);
        assert_eq!(select_latest(&list, "", LatestPolicy::Lenient).unwrap(), "1.1.0");
        assert_eq!(select_latest(&list, "1.0", LatestPolicy::Strict).unwrap(), "1.0.0");

        assert_eq!(select_latest(&list, "2.", LatestPolicy::Lenient).unwrap(), "1.1.0");
        assert!(matches!(
            select_latest(&list, "2.", LatestPolicy::Strict),
            Err(PluginError::Engine(toolsmith_engine::Error::NoMatch { .. }))
        ));

        for policy in [LatestPolicy::Lenient, LatestPolicy::Strict] {
            assert!(matches!(
                select_latest(&[], "", policy),
                Err(PluginError::Engine(toolsmith_engine::Error::NoVersions))
            ));
        }
    }

    #[test]
    fn test_render_exec_env() {
        let mut meta = PluginMeta::default();
        meta.exec_env
            .insert("GOROOT".to_string(), "{install_dir}/go".to_string());
        let env = meta.render_exec_env(Path::new("/data/installs/go/1.21.0"));
        assert_eq!(env["GOROOT"], "/data/installs/go/1.21.0/go");
    }
}
