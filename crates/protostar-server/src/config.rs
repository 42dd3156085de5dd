//! Server configuration

use protostar_classifiers::ScoringConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Server configuration, read from `config.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Scoring pipeline artifacts and options
    #[serde(default)]
    pub scoring: ScoringConfig,

    /// JSON snapshot of users and posts; in-memory only when unset
    #[serde(default = "default_store_path")]
    pub store_path: Option<PathBuf>,

    /// Longest accepted post, in characters
    #[serde(default = "default_max_post_chars")]
    pub max_post_chars: usize,

    /// Request body size limit
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Posts returned by `GET /posts`
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,

    #[serde(default)]
    pub sessions: SessionConfig,
}

/// Login session lifetimes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: i64,

    /// Lifetime of a "remember me" login
    #[serde(default = "default_remember_ttl")]
    pub remember_ttl_secs: i64,
}

impl ServerConfig {
    /// Load configuration from file, falling back to defaults when it is absent
    pub fn load(config_path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let config_path = config_path.as_ref();
        let config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            Self::default()
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.scoring.validate()?;
        if self.max_post_chars == 0 {
            anyhow::bail!("max_post_chars must be positive");
        }
        if self.feed_limit == 0 {
            anyhow::bail!("feed_limit must be positive");
        }
        if self.sessions.ttl_secs <= 0 || self.sessions.remember_ttl_secs <= 0 {
            anyhow::bail!("session lifetimes must be positive");
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            scoring: ScoringConfig::default(),
            store_path: default_store_path(),
            max_post_chars: default_max_post_chars(),
            body_limit_bytes: default_body_limit(),
            feed_limit: default_feed_limit(),
            sessions: SessionConfig::default(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            remember_ttl_secs: default_remember_ttl(),
        }
    }
}

fn default_store_path() -> Option<PathBuf> {
    Some(PathBuf::from("protostar/site.json"))
}

fn default_max_post_chars() -> usize {
    140
}

fn default_body_limit() -> usize {
    64 * 1024
}

fn default_feed_limit() -> usize {
    100
}

fn default_session_ttl() -> i64 {
    12 * 60 * 60
}

fn default_remember_ttl() -> i64 {
    30 * 24 * 60 * 60
}
