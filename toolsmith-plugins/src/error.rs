use thiserror::Error;

#[derive(Error, Debug)]
pub enum PluginError {
    #[error(transparent)]
    Engine(#[from] toolsmith_engine::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown tool '{name}'. Available tools: {available}")]
    UnknownTool { name: String, available: String },

    #[error("Invalid entry in {path} at line {line}: '{content}'. Expected '<name> <version>'")]
    InvalidPinLine {
        path: String,
        line: usize,
        content: String,
    },

    #[error("No version found in {path}")]
    EmptyVersionFile { path: String },

    #[error("Refresh task for {tool} did not complete: {message}")]
    TaskFailed { tool: String, message: String },
}

pub type Result<T> = std::result::Result<T, PluginError>;

impl PluginError {
    /// Whether a caller-level retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Engine(e) => e.is_transient(),
            _ => false,
        }
    }
}
