//! # toolsmith-plugins
//!
//! The plugin layer on top of `toolsmith-engine`.
//!
//! ## Overview
//!
//! A tool is a [`Plugin`]. Most tools are one of two configuration-driven
//! kinds: [`BinaryPlugin`] for prebuilt executables and
//! [`SourceBuildPlugin`] for tools compiled from a source archive by
//! caller-supplied hooks. Tools are looked up by name in a [`Registry`] that
//! is built once at startup.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use toolsmith_engine::config::EngineConfig;
//! use toolsmith_engine::installer::BinaryPluginConfig;
//! use toolsmith_plugins::{BinaryPlugin, EngineContext, Plugin, PluginMeta, Registry};
//!
//! # async fn run() -> toolsmith_plugins::Result<()> {
//! let config = EngineConfig::load(&EngineConfig::default_path())?;
//! let ctx = EngineContext::from_config(&config)?;
//! let registry = Registry::builder()
//!     .register("gh", |ctx: &EngineContext| -> Arc<dyn Plugin> {
//!         Arc::new(BinaryPlugin::new(
//!             BinaryPluginConfig::new("gh", "cli", "cli"),
//!             PluginMeta::default(),
//!             ctx.clone(),
//!         ))
//!     })
//!     .build();
//!
//! let gh = registry.get("gh", &ctx)?;
//! let version = gh.latest_stable("").await?;
//! let layout = config.layout();
//! gh.install(
//!     &version,
//!     &layout.download_dir("gh", &version),
//!     &layout.install_dir("gh", &version),
//! )
//! .await?;
//! # Ok(())
//! # }
//! ```

/// Configuration-driven plugin for prebuilt binaries
pub mod binary;

/// Shared collaborators handed to every plugin
pub mod context;

/// Error types and error handling utilities
pub mod error;

/// The plugin contract and its defaults
pub mod plugin;

/// Bulk refresh of latest versions
pub mod refresh;

/// Closed tool registry
pub mod registry;

/// Network retry logic with exponential backoff
pub mod retry;

/// Configuration-driven plugin for source builds
pub mod source;

/// The `.tool-versions` pin file
pub mod tool_versions;

pub use binary::BinaryPlugin;
pub use context::EngineContext;
pub use error::{PluginError, Result};
pub use plugin::{Help, LatestPolicy, Plugin, PluginMeta};
pub use refresh::{refresh_all, RefreshReport};
pub use registry::{Registry, RegistryBuilder};
pub use retry::RetryConfig;
pub use source::SourceBuildPlugin;
