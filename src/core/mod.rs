pub mod config;
pub mod error;
pub mod memo;
pub mod types;

pub use config::{AgentConfig, MouseMovementConfig};
pub use error::{AgentError, Result};
pub use memo::Memo;
