use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub state_path: PathBuf,
    pub prices_path: Option<PathBuf>,
    pub snapshot_interval: Duration,
    pub snapshot_initial_delay: Duration,
    pub request_timeout: Duration,
    pub log_format: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let state_path = std::env::var("FT_STATE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/state.json"));
        let prices_path = std::env::var("FT_PRICES_PATH")
            .ok()
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        let snapshot_interval =
            Duration::from_secs(env_u64("FT_SNAPSHOT_INTERVAL_SECS", 86_400).max(1));
        let snapshot_initial_delay =
            Duration::from_secs(env_u64("FT_SNAPSHOT_INITIAL_DELAY_SECS", 60));
        let request_timeout = Duration::from_millis(env_u64("FT_REQUEST_TIMEOUT_MS", 30_000));
        let log_format = std::env::var("FT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

        Self {
            state_path,
            prices_path,
            snapshot_interval,
            snapshot_initial_delay,
            request_timeout,
            log_format,
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
