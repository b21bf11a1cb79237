//! # toolsmith-engine
//!
//! The machinery shared by every tool plugin: finding versions, downloading
//! and verifying artifacts, unpacking untrusted archives and installing
//! either a prebuilt binary or a from-source build into a per-version
//! directory.
//!
//! ## Overview
//!
//! - [`version`] orders and selects version strings.
//! - [`version_source`] lists versions from GitHub tags or releases, or from
//!   an HTTP index.
//! - [`fetch`] downloads files atomically over an injected `reqwest` client.
//! - [`archive`] extracts tar.gz, tar.xz, zip and gz with path-traversal and
//!   size guards.
//! - [`checksum`] keeps the trust-on-first-use `.tool-sums` ledger under an
//!   advisory file lock.
//! - [`installer`] holds the binary and source-build strategies.
//!
//! ## Configuration
//!
//! [`config::EngineConfig`] is read from `<config dir>/toolsmith/config.toml`.
//! `TOOLSMITH_DATA_DIR` overrides the data root and `TOOLSMITH_ARCH` the
//! detected CPU architecture.

/// Archive extraction with traversal and size guards
pub mod archive;

/// Checksum ledger and download-directory hashing
pub mod checksum;

/// Configuration file handling and data directory layout
pub mod config;

/// Error types and error handling utilities
pub mod error;

/// HTTP client construction and artifact downloads
pub mod fetch;

/// Binary and source-build installers
pub mod installer;

/// Subscriber setup for embedding programs and tests
pub mod logging;

/// Host platform detection and remapping
pub mod platform;

/// Filename and URL template rendering
pub mod template;

/// File helpers shared by the installers and the ledger
pub mod utils;

/// Version comparison and selection
pub mod version;

/// Version listing from GitHub and HTTP indexes
pub mod version_source;

pub use error::{Error, Result};
