use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overrides the detected CPU architecture.
pub const ARCH_ENV: &str = "TOOLSMITH_ARCH";

/// Overrides the data directory root.
pub const DATA_DIR_ENV: &str = "TOOLSMITH_DATA_DIR";

/// File name of the checksum ledger inside the data root.
pub const LEDGER_FILE: &str = ".tool-sums";

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub refresh: RefreshConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GitHubConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Name of the environment variable holding an API token.
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_env: default_token_env(),
        }
    }
}

impl GitHubConfig {
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.token_env)
            .ok()
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RefreshConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
        }
    }
}

fn default_timeout() -> u64 {
    30 * 60
}

fn default_user_agent() -> String {
    format!("toolsmith/{}", env!("CARGO_PKG_VERSION"))
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_max_retries() -> u32 {
    3
}

impl EngineConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(EngineConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| Error::Config {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "toolsmith")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/toolsmith/config.toml"))
    }

    /// Resolve the data layout using the process environment.
    pub fn layout(&self) -> DataLayout {
        DataLayout::resolve(self, std::env::var(DATA_DIR_ENV).ok())
    }
}

/// Default download, install and ledger locations under one data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Environment override, then config, then the platform data dir.
    pub fn resolve(config: &EngineConfig, env_override: Option<String>) -> Self {
        if let Some(dir) = env_override.filter(|d| !d.is_empty()) {
            return Self::new(dir);
        }
        if let Some(dir) = &config.data_dir {
            return Self::new(dir.clone());
        }
        let root = directories::ProjectDirs::from("", "", "toolsmith")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(".toolsmith")))
            .unwrap_or_else(|| PathBuf::from(".toolsmith"));
        Self::new(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn download_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.root.join("downloads").join(tool).join(version)
    }

    pub fn install_dir(&self, tool: &str, version: &str) -> PathBuf {
        self.root.join("installs").join(tool).join(version)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join(LEDGER_FILE)
    }
}
