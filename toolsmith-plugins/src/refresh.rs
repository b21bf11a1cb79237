//! Resolve the latest version of every registered tool concurrently.

use std::collections::BTreeMap;
use std::path::Path;

use crate::context::EngineContext;
use crate::error::{PluginError, Result};
use crate::registry::Registry;
use crate::retry::{with_retry, RetryConfig};
use crate::tool_versions;

/// Per-tool outcome of [`refresh_all`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RefreshReport {
    /// Tool name to the latest version found.
    pub updated: BTreeMap<String, String>,
    /// Tool name to the reason it could not be resolved.
    pub failed: BTreeMap<String, String>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Query `latest_stable("")` for every tool in one task each, then write
/// the merged pins to `output` once.
///
/// A tool that fails keeps whatever pin `output` already had. Malformed
/// lines in `output` are dropped with a warning.
pub async fn refresh_all(
    registry: &Registry,
    ctx: &EngineContext,
    retry: &RetryConfig,
    output: &Path,
) -> Result<RefreshReport> {
    let mut handles = Vec::with_capacity(registry.len());
    for name in registry.names() {
        let plugin = registry.get(name, ctx)?;
        let retry = retry.clone();
        let handle = tokio::spawn(async move {
            let label = format!("Resolving latest {name}");
            with_retry(&label, &retry, || plugin.latest_stable("")).await
        });
        handles.push((name, handle));
    }

    let mut report = RefreshReport::default();
    for (name, handle) in handles {
        let outcome = handle.await.unwrap_or_else(|e| {
            Err(PluginError::TaskFailed {
                tool: name.to_string(),
                message: e.to_string(),
            })
        });
        match outcome {
            Ok(version) => {
                tracing::info!("{} latest is {}", name, version);
                report.updated.insert(name.to_string(), version);
            }
            Err(e) => {
                tracing::warn!("Could not refresh {}: {}", name, e);
                report.failed.insert(name.to_string(), e.to_string());
            }
        }
    }

    let mut pins = tool_versions::read_lenient(output).unwrap_or_else(|e| {
        tracing::warn!("Could not read existing pins from {}: {}", output.display(), e);
        tool_versions::ToolVersions::new()
    });
    pins.extend(report.updated.clone());
    tool_versions::write(output, &pins)?;

    tracing::info!(
        "Refreshed {} tools, {} failed",
        report.updated.len(),
        report.failed.len()
    );
    Ok(report)
}
