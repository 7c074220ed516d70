use std::env;
use std::time::Duration;

use crate::distribution::{DEFAULT_HEIGHT, DEFAULT_PADDING, DEFAULT_WIDTH, Viewport};

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_TIMEOUT_SECS: u64 = 20;
const DEFAULT_CACHE_TTL_SECS: u64 = 900;
const DEFAULT_HISTORY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub timeout: Duration,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            cache_enabled: true,
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let base_url = env::var("API_URL")
            .ok()
            .map(|s| normalize_base_url(&s))
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let token = env::var("API_TOKEN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let timeout_secs = env_u64("API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS).clamp(2, 120);
        let cache_ttl_secs =
            env_u64("ANALYSIS_CACHE_TTL_SECS", DEFAULT_CACHE_TTL_SECS).clamp(0, 86_400);

        Self {
            base_url,
            token,
            timeout: Duration::from_secs(timeout_secs),
            cache_enabled: env_bool("ANALYSIS_CACHE", true),
            cache_ttl_secs,
        }
    }

    pub fn analyze_url(&self) -> String {
        format!("{}/api/analyze-leg", self.base_url)
    }
}

pub fn history_limit_from_env() -> usize {
    env::var("HISTORY_LIMIT")
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, 200)
}

/// Curve viewport from `CURVE_WIDTH`/`CURVE_HEIGHT`/`CURVE_PADDING`.
/// Falls back to the default when the combination leaves no drawable area.
pub fn viewport_from_env() -> Viewport {
    let width = env_f64("CURVE_WIDTH", DEFAULT_WIDTH);
    let height = env_f64("CURVE_HEIGHT", DEFAULT_HEIGHT);
    let padding = env_f64("CURVE_PADDING", DEFAULT_PADDING);
    Viewport::new(width, height, padding).unwrap_or_default()
}

pub fn normalize_base_url(raw: &str) -> String {
    raw.trim().trim_end_matches('/').to_string()
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| {
            let t = v.trim().to_ascii_lowercase();
            !(t.is_empty() || t == "0" || t == "false" || t == "off" || t == "no")
        })
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slashes() {
        assert_eq!(
            normalize_base_url(" https://api.example.com// "),
            "https://api.example.com"
        );
    }

    #[test]
    fn analyze_url_joins_path() {
        let cfg = ApiConfig {
            base_url: "http://localhost:9000".to_string(),
            ..ApiConfig::default()
        };
        assert_eq!(cfg.analyze_url(), "http://localhost:9000/api/analyze-leg");
    }
}
