//! Host platform detection and per-tool platform/arch remapping.

use std::collections::BTreeMap;

use crate::config::ARCH_ENV;
use crate::error::{Error, Result};

/// Optional lookup table from host identifiers to a tool's naming scheme.
pub type PlatformMap = BTreeMap<String, String>;

/// Operating system and CPU architecture of the running host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPlatform {
    pub os: String,
    pub arch: String,
}

impl HostPlatform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// Detect the host, honouring the architecture override variable.
    pub fn detect() -> Self {
        Self::detect_with(std::env::var(ARCH_ENV).ok())
    }

    pub fn detect_with(arch_override: Option<String>) -> Self {
        let arch = arch_override
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| std::env::consts::ARCH.to_string());
        Self::new(std::env::consts::OS, arch)
    }

    pub fn resolve_os(&self, tool: &str, map: Option<&PlatformMap>) -> Result<String> {
        remap(&self.os, map).ok_or_else(|| Error::UnsupportedPlatform {
            tool: tool.to_string(),
            platform: self.os.clone(),
        })
    }

    pub fn resolve_arch(&self, tool: &str, map: Option<&PlatformMap>) -> Result<String> {
        remap(&self.arch, map).ok_or_else(|| Error::UnsupportedArch {
            tool: tool.to_string(),
            arch: self.arch.clone(),
        })
    }
}

fn remap(key: &str, map: Option<&PlatformMap>) -> Option<String> {
    match map {
        Some(map) => map.get(key).cloned(),
        None => Some(key.to_string()),
    }
}
