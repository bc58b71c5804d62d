use std::{env, str::FromStr, time::Duration};

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Cache TTL in seconds (default: 300)
    pub cache_ttl_seconds: u64,
    /// Maximum number of cache entries (default: 10,000)
    pub cache_max_entries: usize,
    /// Path to SQLite database file (default: "dealflow.db")
    /// Note: Only used when the `sqlite` feature is enabled.
    #[cfg_attr(not(feature = "sqlite"), allow(dead_code))]
    pub sqlite_path: String,
    /// Requests a client may burst before being limited (default: 120)
    pub rate_limit_burst: u32,
    /// Sustained requests per second per client (default: 20)
    pub rate_limit_per_second: u32,
    /// Largest accepted document upload, in bytes (default: 25 MiB)
    pub max_document_bytes: usize,
    /// Request timeout in seconds (default: 30)
    pub request_timeout_seconds: u64,
    /// Username of the bootstrap admin (default: "admin")
    pub admin_username: String,
    /// Password of the bootstrap admin. No account is created when unset.
    pub admin_password: Option<String>,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `CACHE_TTL_SECONDS` - Cache TTL in seconds (default: 300)
    /// - `CACHE_MAX_ENTRIES` - Maximum cache entries (default: 10,000)
    /// - `SQLITE_PATH` - SQLite database path (default: "dealflow.db")
    /// - `RATE_LIMIT_BURST` - Token bucket capacity (default: 120)
    /// - `RATE_LIMIT_PER_SECOND` - Token refill rate (default: 20)
    /// - `MAX_DOCUMENT_BYTES` - Upload size limit (default: 26,214,400)
    /// - `REQUEST_TIMEOUT_SECONDS` - Request timeout (default: 30)
    /// - `ADMIN_USERNAME` - Bootstrap admin username (default: "admin")
    /// - `ADMIN_PASSWORD` - Bootstrap admin password (optional)
    pub fn from_env() -> Self {
        Self {
            cache_ttl_seconds: env_or("CACHE_TTL_SECONDS", 300),
            cache_max_entries: env_or("CACHE_MAX_ENTRIES", 10_000),
            sqlite_path: env::var("SQLITE_PATH").unwrap_or_else(|_| "dealflow.db".to_string()),
            rate_limit_burst: env_or("RATE_LIMIT_BURST", 120),
            rate_limit_per_second: env_or("RATE_LIMIT_PER_SECOND", 20),
            max_document_bytes: env_or("MAX_DOCUMENT_BYTES", 25 * 1024 * 1024),
            request_timeout_seconds: env_or("REQUEST_TIMEOUT_SECONDS", 30),
            admin_username: env::var("ADMIN_USERNAME")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "admin".to_string()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|v| !v.is_empty()),
        }
    }

    /// Get cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }

    /// Get the request timeout as a Duration.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            cache_ttl_seconds: 600,
            cache_max_entries: 10_000,
            sqlite_path: "test.db".to_string(),
            rate_limit_burst: 120,
            rate_limit_per_second: 20,
            max_document_bytes: 1024,
            request_timeout_seconds: 5,
            admin_username: "admin".to_string(),
            admin_password: None,
        }
    }

    #[test]
    fn test_duration_conversions() {
        let config = config();
        assert_eq!(config.cache_ttl(), Duration::from_secs(600));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_default_values() {
        // Clear environment variables to test defaults
        for name in [
            "CACHE_TTL_SECONDS",
            "CACHE_MAX_ENTRIES",
            "SQLITE_PATH",
            "RATE_LIMIT_BURST",
            "RATE_LIMIT_PER_SECOND",
            "MAX_DOCUMENT_BYTES",
            "REQUEST_TIMEOUT_SECONDS",
            "ADMIN_USERNAME",
            "ADMIN_PASSWORD",
        ] {
            env::remove_var(name);
        }

        let config = Config::from_env();

        assert_eq!(config.cache_ttl_seconds, 300);
        assert_eq!(config.cache_max_entries, 10_000);
        assert_eq!(config.sqlite_path, "dealflow.db");
        assert_eq!(config.rate_limit_burst, 120);
        assert_eq!(config.rate_limit_per_second, 20);
        assert_eq!(config.max_document_bytes, 26_214_400);
        assert_eq!(config.request_timeout_seconds, 30);
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.admin_password, None);
    }

    #[test]
    fn test_unparsable_value_falls_back() {
        assert_eq!(env_or("DEALFLOW_TEST_UNSET_VARIABLE", 7u32), 7);
    }
}
