use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    /// Scratch state was touched after the snapshot was locked.
    #[error("Access denied: scratch state is locked for this tick")]
    AccessDenied,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Cursor driver error: {0}")]
    CursorDriver(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;
