use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Client;

use crate::config::HttpConfig;
use crate::error::{Error, Result};

/// Build the shared HTTP client. The timeout is a ceiling for a whole
/// transfer; nothing at this layer retries.
pub fn build_client(config: &HttpConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Downloads artifacts and small text payloads over an injected client.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Download `url` to `dest`.
    ///
    /// The body is streamed into a temporary file next to `dest` and renamed
    /// into place, so `dest` is either absent or complete. The temporary file
    /// is removed on every failure path.
    pub async fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        tracing::info!("Downloading {} to {}", url, dest.display());

        let response = self.get(url).await?;

        let parent = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut temp_file = tempfile::Builder::new()
            .prefix(".download-")
            .tempfile_in(parent)?;

        let mut stream = response.bytes_stream();
        let mut received = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            temp_file.write_all(&chunk)?;
        }
        temp_file.as_file_mut().sync_all()?;

        temp_file.persist(dest).map_err(|e| Error::Io(e.error))?;
        tracing::debug!("Downloaded {} bytes from {}", received, url);
        Ok(())
    }

    /// Fetch a small payload such as a version index or checksum manifest.
    pub async fn download_string(&self, url: &str) -> Result<String> {
        tracing::debug!("Fetching {}", url);
        let response = self.get(url).await?;
        Ok(response.text().await?)
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            tracing::debug!("GET {} returned {}", url, status);
            return Err(Error::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response)
    }
}
