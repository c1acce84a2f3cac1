//! Runtime configuration
//!
//! Every setting has a default and can be overridden through a
//! `ZONE_TURNS_*` environment variable.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::collector::DEFAULT_COLLAPSE_GAP;
use crate::state_store::{DEFAULT_SWEEP_INTERVAL, DEFAULT_TTL};

/// Errors raised while reading the configuration
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

/// Configuration of the turn detection pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of partition workers
    pub partitions: usize,
    /// Idle time after which an object's state is evicted
    pub ttl: Duration,
    /// Interval between eviction sweeps
    pub sweep_interval: Duration,
    /// Same-zone visits separated by less than this are merged
    pub collapse_gap: Duration,
    /// Bound of each partition's input queue
    pub channel_capacity: usize,
    /// Also write sequence snapshots to the output
    pub emit_sequences: bool,
    /// Directory for store snapshots, persistence is off when unset
    pub data_dir: Option<PathBuf>,
    /// Address of the HTTP status API, disabled when unset
    pub http_addr: Option<SocketAddr>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            partitions: 4,
            ttl: DEFAULT_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            collapse_gap: DEFAULT_COLLAPSE_GAP,
            channel_capacity: 1024,
            emit_sequences: false,
            data_dir: None,
            http_addr: None,
        }
    }
}

impl PipelineConfig {
    /// Build the configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            partitions: parse_var(&lookup, "ZONE_TURNS_PARTITIONS")?.unwrap_or(defaults.partitions),
            ttl: parse_var(&lookup, "ZONE_TURNS_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.ttl),
            sweep_interval: parse_var(&lookup, "ZONE_TURNS_SWEEP_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            collapse_gap: parse_var(&lookup, "ZONE_TURNS_COLLAPSE_GAP_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.collapse_gap),
            channel_capacity: parse_var(&lookup, "ZONE_TURNS_CHANNEL_CAPACITY")?
                .unwrap_or(defaults.channel_capacity),
            emit_sequences: parse_var(&lookup, "ZONE_TURNS_EMIT_SEQUENCES")?
                .unwrap_or(defaults.emit_sequences),
            data_dir: lookup("ZONE_TURNS_DATA_DIR")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            http_addr: parse_var(&lookup, "ZONE_TURNS_HTTP_ADDR")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partitions == 0 {
            return Err(ConfigError::Zero("ZONE_TURNS_PARTITIONS"));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::Zero("ZONE_TURNS_CHANNEL_CAPACITY"));
        }
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Zero("ZONE_TURNS_SWEEP_SECS"));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
    }
}
