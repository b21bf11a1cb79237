//! Where version lists come from: GitHub tags, GitHub releases, or an
//! arbitrary HTTP index parsed by a caller-supplied callback.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use octocrab::Octocrab;

use crate::error::{Error, Result};
use crate::fetch::Fetcher;
use crate::version;

const PER_PAGE: u8 = 100;

/// Raw tag and release names for a repository.
#[async_trait]
pub trait VersionSource: Send + Sync {
    async fn get_tags(&self, repo_url: &str) -> Result<Vec<String>>;
    async fn get_releases(&self, repo_url: &str) -> Result<Vec<String>>;
}

/// GitHub REST API backed version source.
///
/// The API client is built per request, so a source can be created outside
/// of a runtime.
#[derive(Debug, Clone)]
pub struct GitHubVersionSource {
    api_base: String,
    token: Option<String>,
}

impl GitHubVersionSource {
    pub fn new(api_base: impl Into<String>, token: Option<String>) -> Self {
        Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn client(&self, repo: &str) -> Result<Octocrab> {
        let api_error = |source| Error::GitHub {
            repo: repo.to_string(),
            source,
        };
        let mut builder = Octocrab::builder()
            .base_uri(self.api_base.as_str())
            .map_err(api_error)?;
        if let Some(token) = &self.token {
            builder = builder.personal_token(token.clone());
        }
        builder.build().map_err(api_error)
    }

    fn map_error(&self, owner: &str, repo: &str, endpoint: &str, err: octocrab::Error) -> Error {
        match err {
            octocrab::Error::GitHub { source, .. } => Error::DownloadFailed {
                url: format!("{}/repos/{}/{}/{}", self.api_base, owner, repo, endpoint),
                status: source.status_code.as_u16(),
            },
            other => Error::GitHub {
                repo: format!("{owner}/{repo}"),
                source: other,
            },
        }
    }
}

#[async_trait]
impl VersionSource for GitHubVersionSource {
    async fn get_tags(&self, repo_url: &str) -> Result<Vec<String>> {
        let (owner, repo) = parse_repo(repo_url)?;
        let octocrab = self.client(&repo)?;
        let fail = |e| self.map_error(&owner, &repo, "tags", e);

        let first = octocrab
            .repos(&owner, &repo)
            .list_tags()
            .per_page(PER_PAGE)
            .send()
            .await
            .map_err(fail)?;
        let tags = octocrab.all_pages(first).await.map_err(fail)?;

        tracing::debug!("Fetched {} tags for {}/{}", tags.len(), owner, repo);
        Ok(tags.into_iter().map(|t| t.name).collect())
    }

    async fn get_releases(&self, repo_url: &str) -> Result<Vec<String>> {
        let (owner, repo) = parse_repo(repo_url)?;
        let octocrab = self.client(&repo)?;
        let fail = |e| self.map_error(&owner, &repo, "releases", e);

        let first = octocrab
            .repos(&owner, &repo)
            .releases()
            .list()
            .per_page(PER_PAGE)
            .send()
            .await
            .map_err(fail)?;
        let releases = octocrab.all_pages(first).await.map_err(fail)?;

        tracing::debug!("Fetched {} releases for {}/{}", releases.len(), owner, repo);
        Ok(releases
            .into_iter()
            .filter(|r| !r.draft)
            .map(|r| r.tag_name)
            .collect())
    }
}

/// Split `owner/repo`, `https://github.com/owner/repo` or a `.git` URL.
pub fn parse_repo(input: &str) -> Result<(String, String)> {
    let invalid = || Error::InvalidRepo {
        input: input.to_string(),
    };

    let trimmed = input.trim();
    let path = ["https://github.com/", "http://github.com/", "github.com/"]
        .iter()
        .find_map(|prefix| trimmed.strip_prefix(prefix))
        .unwrap_or(trimmed);
    let path = path.trim_end_matches('/');
    let path = path.strip_suffix(".git").unwrap_or(path);

    let parts: Vec<&str> = path.split('/').collect();
    match parts.as_slice() {
        [owner, repo] if !owner.is_empty() && !repo.is_empty() && !owner.contains(':') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(invalid()),
    }
}

/// Turns the body of a version index into version strings.
pub type IndexParser = Arc<dyn Fn(&str) -> anyhow::Result<Vec<String>> + Send + Sync>;

/// How a plugin discovers its versions.
#[derive(Clone)]
pub enum VersionSourceConfig {
    GitHubTags,
    GitHubReleases,
    HttpIndex { url: String, parser: IndexParser },
}

impl fmt::Debug for VersionSourceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GitHubTags => write!(f, "GitHubTags"),
            Self::GitHubReleases => write!(f, "GitHubReleases"),
            Self::HttpIndex { url, .. } => f.debug_struct("HttpIndex").field("url", url).finish(),
        }
    }
}

impl VersionSourceConfig {
    /// Fetch and normalise the version list, sorted ascending.
    pub async fn list(
        &self,
        source: &dyn VersionSource,
        fetcher: &Fetcher,
        repo_url: &str,
        tag_prefix: &str,
    ) -> Result<Vec<String>> {
        let raw = match self {
            Self::GitHubTags => source.get_tags(repo_url).await?,
            Self::GitHubReleases => source.get_releases(repo_url).await?,
            Self::HttpIndex { url, parser } => {
                let body = fetcher.download_string(url).await?;
                parser(&body).map_err(|e| Error::VersionIndex {
                    url: url.clone(),
                    reason: format!("{e:#}"),
                })?
            }
        };
        Ok(normalize_tags(raw, tag_prefix))
    }
}

/// Strip `prefix`, drop empties and duplicates, sort ascending.
pub fn normalize_tags(tags: Vec<String>, prefix: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut versions: Vec<String> = tags
        .into_iter()
        .map(|tag| {
            let tag = tag.trim();
            tag.strip_prefix(prefix).unwrap_or(tag).to_string()
        })
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.clone()))
        .collect();
    version::sort(&mut versions);
    versions
}

/// Parser for a JSON array of objects carrying the version under `field`.
pub fn json_index_parser(field: &str) -> IndexParser {
    let field = field.to_string();
    Arc::new(move |body: &str| -> anyhow::Result<Vec<String>> {
        let entries: Vec<serde_json::Value> = serde_json::from_str(body)?;
        entries
            .iter()
            .map(|entry| {
                entry
                    .get(&field)
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("entry without string field '{}'", field))
            })
            .collect()
    })
}
