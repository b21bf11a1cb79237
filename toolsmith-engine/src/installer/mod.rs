//! The two generic install strategies every tool plugin configures.

pub mod binary;
pub mod source;

pub use binary::{BinaryInstaller, BinaryPluginConfig};
pub use source::{
    command_hook, BuildContext, HookFn, SourceBuildInstaller, SourceBuildPluginConfig, SourceDir,
    SourceUrl, UrlResolverFn,
};

/// Name of the scratch directory prefix used for extraction.
pub(crate) const SCRATCH_PREFIX: &str = ".extract-";
