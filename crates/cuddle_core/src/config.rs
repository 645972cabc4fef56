use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::random::{IMAGE_POOL_SIZE, MAX_DELAY_SECS};
use crate::scheduler::IdentifierPolicy;

pub const ENV_BATCH_COUNT: &str = "CUDDLE_BATCH_COUNT";
pub const ENV_NOW_DELAY_SECS: &str = "CUDDLE_NOW_DELAY_SECS";
pub const ENV_MAX_DELAY_SECS: &str = "CUDDLE_MAX_DELAY_SECS";
pub const ENV_IMAGE_POOL: &str = "CUDDLE_IMAGE_POOL";
pub const ENV_ASSET_ROOT: &str = "CUDDLE_ASSET_ROOT";
pub const ENV_UNIQUE_IDS: &str = "CUDDLE_UNIQUE_IDS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuddleConfig {
    /// Notifications scheduled by one batch; zero schedules nothing.
    pub batch_count: usize,
    /// Delay used by "cuddle me now".
    pub now_delay_secs: f64,
    pub max_delay_secs: u32,
    pub image_pool_size: u32,
    pub asset_root: PathBuf,
    pub identifier_policy: IdentifierPolicy,
}

impl CuddleConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup; unset keys keep their
    /// defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_BATCH_COUNT) {
            config.batch_count = parse(ENV_BATCH_COUNT, &value)?;
        }
        if let Some(value) = lookup(ENV_NOW_DELAY_SECS) {
            let delay: f64 = parse(ENV_NOW_DELAY_SECS, &value)?;
            if !delay.is_finite() || delay < 0.0 {
                return Err(ConfigError::InvalidValue {
                    var: ENV_NOW_DELAY_SECS,
                    value,
                });
            }
            config.now_delay_secs = delay;
        }
        if let Some(value) = lookup(ENV_MAX_DELAY_SECS) {
            let max: u32 = parse(ENV_MAX_DELAY_SECS, &value)?;
            config.max_delay_secs = positive(ENV_MAX_DELAY_SECS, max)?;
        }
        if let Some(value) = lookup(ENV_IMAGE_POOL) {
            let pool: u32 = parse(ENV_IMAGE_POOL, &value)?;
            config.image_pool_size = positive(ENV_IMAGE_POOL, pool)?;
        }
        if let Some(value) = lookup(ENV_ASSET_ROOT) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                config.asset_root = PathBuf::from(trimmed);
            }
        }
        if let Some(value) = lookup(ENV_UNIQUE_IDS) {
            let unique: bool = parse(ENV_UNIQUE_IDS, &value.to_ascii_lowercase())?;
            config.identifier_policy = if unique {
                IdentifierPolicy::Unique
            } else {
                IdentifierPolicy::ImageName
            };
        }
        debug!(?config, "configuration resolved");
        Ok(config)
    }

    /// Resource reference for a bundled image.
    pub fn image_url(&self, image_name: &str) -> String {
        self.asset_root
            .join(format!("{image_name}.jpg"))
            .display()
            .to_string()
    }
}

impl Default for CuddleConfig {
    fn default() -> Self {
        Self {
            batch_count: 3,
            now_delay_secs: 5.0,
            max_delay_secs: MAX_DELAY_SECS,
            image_pool_size: IMAGE_POOL_SIZE,
            asset_root: PathBuf::from("assets"),
            identifier_policy: IdentifierPolicy::ImageName,
        }
    }
}

fn parse<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        })
}

fn positive(var: &'static str, value: u32) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::MustBePositive { var });
    }
    Ok(value)
}
