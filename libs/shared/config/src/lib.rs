use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_base_url: String,
    pub backend_api_key: String,
    pub jwt_secret: String,
    pub session_store_path: PathBuf,
    pub eligibility_tick_ms: u64,
    pub query_stale_seconds: u64,
    pub bind_addr: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            backend_base_url: env::var("BACKEND_BASE_URL")
                .unwrap_or_else(|_| {
                    warn!("BACKEND_BASE_URL not set, using default");
                    "http://localhost:8080".to_string()
                }),
            backend_api_key: env::var("BACKEND_API_KEY")
                .unwrap_or_else(|_| {
                    warn!("BACKEND_API_KEY not set, using empty value");
                    String::new()
                }),
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("JWT_SECRET not set, using empty value");
                    String::new()
                }),
            session_store_path: env::var("SESSION_STORE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".rehab-session.json")),
            eligibility_tick_ms: parse_or("ELIGIBILITY_TICK_MS", 1000),
            query_stale_seconds: parse_or("QUERY_STALE_SECONDS", 30),
            bind_addr: env::var("BIND_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:3000".to_string()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.backend_base_url.is_empty()
            && !self.jwt_secret.is_empty()
    }

    pub fn eligibility_tick(&self) -> Duration {
        // a zero period would make tokio::time::interval panic
        Duration::from_millis(self.eligibility_tick_ms.max(1))
    }

    pub fn query_stale_time(&self) -> Duration {
        Duration::from_secs(self.query_stale_seconds)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:8080".to_string(),
            backend_api_key: String::new(),
            jwt_secret: String::new(),
            session_store_path: PathBuf::from(".rehab-session.json"),
            eligibility_tick_ms: 1000,
            query_stale_seconds: 30,
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

fn parse_or(key: &str, default: u64) -> u64 {
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} is not a valid number ({}), using {}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_tick_is_one_second() {
        let config = AppConfig::default();
        assert_eq!(config.eligibility_tick(), Duration::from_secs(1));
        assert_eq!(config.query_stale_time(), Duration::from_secs(30));
    }

    #[test]
    fn zero_tick_is_clamped() {
        let config = AppConfig { eligibility_tick_ms: 0, ..AppConfig::default() };
        assert_eq!(config.eligibility_tick(), Duration::from_millis(1));
    }

    #[test]
    fn unconfigured_without_secret() {
        assert!(!AppConfig::default().is_configured());
    }
}
