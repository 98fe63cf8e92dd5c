use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MAPS_DIR: &str = "Odyssey/Maps";
pub const DEFAULT_DAT_PATH: &str = "Odyssey/Data/dat.json";
pub const DEFAULT_SERVER_PORT: u16 = 3000;
pub const DEFAULT_SEGMENT_CACHE_TTL_SECS: i64 = 600; // 10 minutes
pub const DEFAULT_MAX_CACHED_SEGMENTS: usize = 512;
pub const EVICTION_INTERVAL_SECS: u64 = 60;

pub fn maps_dir() -> PathBuf {
    env_path("MAPS_DIR").unwrap_or_else(|| PathBuf::from(DEFAULT_MAPS_DIR))
}

pub fn dat_path() -> PathBuf {
    env_path("DAT_PATH").unwrap_or_else(|| PathBuf::from(DEFAULT_DAT_PATH))
}

pub fn server_port() -> u16 {
    std::env::var("SERVER_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SERVER_PORT)
}

pub fn segment_cache_ttl_secs() -> i64 {
    std::env::var("SEGMENT_CACHE_TTL_SECS")
        .ok()
        .and_then(|value| value.parse::<i64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SEGMENT_CACHE_TTL_SECS)
}

pub fn max_cached_segments() -> usize {
    std::env::var("MAX_CACHED_SEGMENTS")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_MAX_CACHED_SEGMENTS)
}

pub fn eviction_interval() -> Duration {
    Duration::from_secs(EVICTION_INTERVAL_SECS)
}

fn env_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}
