//! TOML configuration file loading
//!
//! A configuration file declares the topics to register and the push consumers
//! to run:
//!
//! ```toml
//! [[topics]]
//! topic_name = "orders"
//! partition_number = 4
//! bounded_capacity = 5000
//!
//! [[consumers]]
//! topic_name = "orders"
//! group_name = "billing"
//! concurrency = 2
//! commit_mode = "manual"
//! lifetime = "scoped"
//! ```
//!
//! Without `--config-file` the default location
//! `<config_dir>/BufferQueue/bufferqueue.toml` is used when it exists, and the
//! built-in demo configuration otherwise.

use crate::push::api::{CommitMode, HandlerLifetime, PushConsumerOptions};
use crate::queue::api::{QueueError, TopicOptions};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Problems loading a configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("The specified configuration file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Error reading configuration file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Error parsing configuration file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] QueueError),
}

/// Where the loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    BuiltIn,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::BuiltIn => write!(f, "built-in demo"),
        }
    }
}

/// Topics and push consumers to set up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BufferConfig {
    #[serde(default)]
    pub topics: Vec<TopicOptions>,
    #[serde(default)]
    pub consumers: Vec<PushConsumerOptions>,
}

impl BufferConfig {
    /// Two topics, three consumer groups, every commit mode and lifetime
    pub fn demo() -> Self {
        Self {
            topics: vec![
                TopicOptions::new("orders")
                    .with_partitions(4)
                    .with_bounded_capacity(5_000),
                TopicOptions::new("audit").with_partitions(2),
            ],
            consumers: vec![
                PushConsumerOptions::new("orders", "billing")
                    .with_batch_size(50)
                    .with_concurrency(2),
                PushConsumerOptions::new("orders", "shipping")
                    .with_concurrency(4)
                    .with_commit_mode(CommitMode::Manual)
                    .with_lifetime(HandlerLifetime::Scoped),
                PushConsumerOptions::new("audit", "archive")
                    .with_batch_size(200)
                    .with_lifetime(HandlerLifetime::Transient),
            ],
        }
    }

    pub fn from_toml(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every option and that consumers only name declared topics
    pub fn validate(&self) -> Result<(), QueueError> {
        let mut declared = HashSet::new();
        for topic in &self.topics {
            topic.validate()?;
            if !declared.insert(topic.topic_name.as_str()) {
                return Err(QueueError::TopicAlreadyRegistered {
                    topic: topic.topic_name.clone(),
                });
            }
        }
        for consumer in &self.consumers {
            consumer.validate()?;
            if !declared.contains(consumer.topic_name.as_str()) {
                return Err(QueueError::TopicNotRegistered {
                    topic: consumer.topic_name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Load the configuration from `config_file`, the default location, or the demo
    pub async fn load(config_file: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let config_path = match config_file {
            Some(path) => {
                // A file named on the command line must exist
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Some(path.to_path_buf())
            }
            None => default_config_path().filter(|path| path.exists()),
        };

        let Some(path) = config_path else {
            log::debug!("No configuration file found, using the built-in demo");
            return Ok((Self::demo(), ConfigSource::BuiltIn));
        };

        log::debug!("Loading configuration from {}", path.display());
        let contents = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
        let config = Self::from_toml(&contents, &path)?;
        Ok((config, ConfigSource::File(path)))
    }
}

/// `<config_dir>/BufferQueue/bufferqueue.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("BufferQueue").join("bufferqueue.toml"))
}
