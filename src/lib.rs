pub mod cli;
pub mod keys;
pub mod paths;
pub mod permissions;
pub mod session;
pub mod settings;
pub mod store;
pub mod tools;

use thiserror::Error;

/// Top-level error type for keyway.
#[derive(Debug, Error)]
pub enum KeywayError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("'{tool}' not found on PATH. {hint}")]
    MissingTool { tool: String, hint: String },
}
