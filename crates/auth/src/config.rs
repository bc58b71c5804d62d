use std::time::Duration;

const DEFAULT_SESSION_TTL_HOURS: u64 = 168;
const DEFAULT_COOKIE_NAME: &str = "dealflow_session";

/// Session and cookie configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub session_ttl: Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
    /// Whether `POST /api/auth/register` accepts self-service sign-ups.
    pub allow_registration: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_HOURS * 60 * 60),
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_secure: true,
            allow_registration: false,
        }
    }
}

impl AuthConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `SESSION_TTL_HOURS`: Session lifetime in hours (default: 168)
    /// - `COOKIE_NAME`: Name of the session cookie (default: `dealflow_session`)
    /// - `COOKIE_SECURE`: Whether to set secure flag on cookies (default: true)
    /// - `ALLOW_REGISTRATION`: Enables self-service sign-up (default: false)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let session_ttl = std::env::var("SESSION_TTL_HOURS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|hours| *hours > 0)
            .map(|hours| Duration::from_secs(hours * 60 * 60))
            .unwrap_or(defaults.session_ttl);

        let cookie_name = std::env::var("COOKIE_NAME")
            .ok()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(defaults.cookie_name);

        Self {
            session_ttl,
            cookie_name,
            cookie_secure: env_flag("COOKIE_SECURE", defaults.cookie_secure),
            allow_registration: env_flag("ALLOW_REGISTRATION", defaults.allow_registration),
        }
    }

    /// Session lifetime as a chrono duration, for expiry arithmetic.
    pub fn session_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.session_ttl.as_secs() as i64)
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    std::env::var(name)
        .map(|v| parse_flag(&v).unwrap_or(default))
        .unwrap_or(default)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
