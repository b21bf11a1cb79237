use std::fmt;
use thiserror::Error;

/// Pipeline stage a caller-supplied hook or callback ran in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    PreBuild,
    Build,
    PostInstall,
    UrlResolver,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreBuild => write!(f, "pre-build"),
            Self::Build => write!(f, "build"),
            Self::PostInstall => write!(f, "post-install"),
            Self::UrlResolver => write!(f, "url resolution"),
        }
    }
}

/// Which of the extraction caps was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeLimit {
    PerFile,
    Total,
}

impl fmt::Display for SizeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PerFile => write!(f, "per-file"),
            Self::Total => write!(f, "total archive"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error at {path}: {message}")]
    Config { path: String, message: String },

    #[error("Failed to download {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("GitHub API request for {repo} failed: {source}")]
    GitHub {
        repo: String,
        #[source]
        source: octocrab::Error,
    },

    #[error("Failed to parse version index from {url}: {reason}")]
    VersionIndex { url: String, reason: String },

    #[error("Invalid repository '{input}'. Expected owner/repo or https://github.com/owner/repo")]
    InvalidRepo { input: String },

    #[error("invalid file path in archive: {path}")]
    InvalidFilePath { path: String },

    #[error("Archive entry {path} exceeds the {limit} size limit of {max} bytes")]
    SizeLimitExceeded {
        path: String,
        limit: SizeLimit,
        max: u64,
    },

    #[error("Archive extraction failed for {file}: {reason}")]
    ArchiveExtraction { file: String, reason: String },

    #[error("Unsupported archive type '{archive_type}'. Supported types: tar.gz, tar.xz, zip, gz")]
    UnsupportedArchiveType { archive_type: String },

    #[error("Checksum mismatch for {name} {version}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        name: String,
        version: String,
        expected: String,
        actual: String,
    },

    #[error("Checksum verification failed for {file}: expected {expected}, got {actual}")]
    ChecksumVerification {
        file: String,
        expected: String,
        actual: String,
    },

    #[error("No checksum for {file} in manifest {url}")]
    ChecksumNotListed { file: String, url: String },

    #[error("Unsupported platform '{platform}' for {tool}")]
    UnsupportedPlatform { tool: String, platform: String },

    #[error("Unsupported architecture '{arch}' for {tool}")]
    UnsupportedArch { tool: String, arch: String },

    #[error("Binary '{name}' not found in extracted archive {archive}")]
    BinaryNotFound { name: String, archive: String },

    #[error("No build step configured for {tool}")]
    MissingBuildStep { tool: String },

    #[error("Extracted source directory missing: {path}")]
    SourceDirMissing { path: String },

    #[error("Install artifact missing: {path}")]
    ArtifactMissing { path: String },

    #[error("{stage} failed: {source}")]
    Hook {
        stage: HookStage,
        #[source]
        source: anyhow::Error,
    },

    #[error("No versions found")]
    NoVersions,

    #[error("No versions match '{query}'")]
    NoMatch { query: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether a caller-level retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e
                        .status()
                        .map(|s| s.is_server_error() || s.as_u16() == 429)
                        .unwrap_or(true)
            }
            Self::DownloadFailed { status, .. } => *status >= 500 || *status == 429,
            Self::GitHub { source, .. } => matches!(
                source,
                octocrab::Error::Hyper { .. } | octocrab::Error::Service { .. }
            ),
            Self::Io(e) => {
                use std::io::ErrorKind;
                matches!(
                    e.kind(),
                    ErrorKind::ConnectionAborted
                        | ErrorKind::ConnectionReset
                        | ErrorKind::ConnectionRefused
                        | ErrorKind::TimedOut
                        | ErrorKind::Interrupted
                        | ErrorKind::UnexpectedEof
                )
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_error_carries_stage_prefix() {
        let err = Error::Hook {
            stage: HookStage::PreBuild,
            source: anyhow::anyhow!("configure exited with 2"),
        };
        assert_eq!(err.to_string(), "pre-build failed: configure exited with 2");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_transient_classification() {
        let server_error = Error::DownloadFailed {
            url: "https://example.com/a".to_string(),
            status: 503,
        };
        assert!(server_error.is_transient());

        let not_found = Error::DownloadFailed {
            url: "https://example.com/a".to_string(),
            status: 404,
        };
        assert!(!not_found.is_transient());

        let reset = Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "Connection reset",
        ));
        assert!(reset.is_transient());

        assert!(!Error::NoVersions.is_transient());
    }
}
