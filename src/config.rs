use std::collections::HashSet;
use std::env;
use std::time::Duration;

use crate::events::swap::DEX_PROGRAMS;

#[derive(Clone, Debug)]
pub struct IngestConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    /// First block requested when no cursor has been established yet.
    pub start_block: u64,
    /// Width of each ranged stream request: [cursor, cursor + batch_size].
    pub batch_size: u64,
    pub dex_programs: HashSet<String>,
    pub whale_threshold_lamports: u64, // smallest-unit threshold
    pub dedup_capacity: usize,
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub heartbeat_interval: Duration,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    pub backoff_factor: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            api_url: "https://portal.sqd.dev/datasets/solana-mainnet".to_string(),
            api_key: None,
            start_block: 0,
            batch_size: 1_000,
            dex_programs: DEX_PROGRAMS.iter().map(|(id, _)| id.to_string()).collect(),
            whale_threshold_lamports: 100 * 1_000_000_000, // 100 SOL
            dedup_capacity: 10_000,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(5),
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
            backoff_factor: 2.0,
        }
    }
}

impl IngestConfig {
    /// Load configuration from the environment, falling back to defaults for
    /// anything unset or unparseable.
    pub fn load_from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var("SOLDEXER_API_URL") {
            config.api_url = url;
        }
        if let Ok(key) = env::var("SOLDEXER_API_KEY") {
            if !key.is_empty() {
                config.api_key = Some(key);
            }
        }
        if let Some(block) = parse_var("INGEST_START_BLOCK") {
            config.start_block = block;
        }
        if let Some(size) = parse_var("INGEST_BATCH_SIZE") {
            config.batch_size = size;
        }
        if let Some(threshold) = parse_var("WHALE_THRESHOLD_LAMPORTS") {
            config.whale_threshold_lamports = threshold;
        }
        if let Some(capacity) = parse_var::<usize>("DEDUP_CAPACITY") {
            config.dedup_capacity = capacity;
        }
        if let Some(secs) = parse_var("HEARTBEAT_INTERVAL_SECS") {
            config.heartbeat_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var("READ_TIMEOUT_SECS") {
            config.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var("CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(millis) = parse_var("BACKOFF_BASE_MS") {
            config.backoff_base = Duration::from_millis(millis);
        }
        if let Some(secs) = parse_var("BACKOFF_MAX_SECS") {
            config.backoff_max = Duration::from_secs(secs);
        }
        if let Some(factor) = parse_var::<f64>("BACKOFF_FACTOR") {
            if factor >= 1.0 {
                config.backoff_factor = factor;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_overrides_connection_and_backoff_tuning() {
        env::set_var("CONNECT_TIMEOUT_SECS", "3");
        env::set_var("BACKOFF_BASE_MS", "250");
        env::set_var("BACKOFF_MAX_SECS", "60");
        env::set_var("BACKOFF_FACTOR", "3.5");

        let config = IngestConfig::load_from_env();
        assert_eq!(config.connect_timeout, Duration::from_secs(3));
        assert_eq!(config.backoff_base, Duration::from_millis(250));
        assert_eq!(config.backoff_max, Duration::from_secs(60));
        assert_eq!(config.backoff_factor, 3.5);

        env::remove_var("CONNECT_TIMEOUT_SECS");
        env::remove_var("BACKOFF_BASE_MS");
        env::remove_var("BACKOFF_MAX_SECS");
        env::remove_var("BACKOFF_FACTOR");
    }

    #[test]
    fn unparseable_values_keep_defaults() {
        env::set_var("DEDUP_CAPACITY", "not-a-number");
        let config = IngestConfig::load_from_env();
        assert_eq!(config.dedup_capacity, IngestConfig::default().dedup_capacity);
        env::remove_var("DEDUP_CAPACITY");
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
