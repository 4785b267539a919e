//! Public API exports for the CLI module

pub use crate::app::cli::args::{Args, DEFAULT_ITEMS, DEFAULT_TIMEOUT_SECS};
pub use crate::app::cli::config::{default_config_path, BufferConfig, ConfigError, ConfigSource};
