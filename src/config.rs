//! Application configuration
//!
//! Every setting can be given as a flag or through the environment. `main`
//! loads `config/config.env` and `.env` before parsing so both sources work.

use crate::middleware::RateLimitConfig;
use clap::Parser;
use std::time::Duration;

pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production-minimum-32-characters";

#[derive(Parser, Debug, Clone)]
#[command(name = "vacq")]
#[command(about = "Hospital directory and vaccination appointment booking API")]
pub struct AppConfig {
    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Runtime mode (development | production)
    #[arg(long, env = "NODE_ENV", default_value = "development")]
    pub node_env: String,

    /// Path to the SQLite database (":memory:" for an ephemeral store)
    #[arg(long, env = "DATABASE_PATH", default_value = "vacq.db")]
    pub database_path: String,

    /// Secret used to sign session tokens
    #[arg(long, env = "JWT_SECRET", default_value = DEV_JWT_SECRET)]
    pub jwt_secret: String,

    /// Session token lifetime in hours
    #[arg(long, env = "JWT_EXPIRE_HOURS", default_value = "720")]
    pub jwt_expire_hours: i64,

    /// Session cookie lifetime in days
    #[arg(long, env = "JWT_COOKIE_EXPIRE_DAYS", default_value = "30")]
    pub jwt_cookie_expire_days: i64,

    /// bcrypt work factor for password hashes
    #[arg(long, env = "BCRYPT_COST", default_value = "10")]
    pub bcrypt_cost: u32,

    /// Requests allowed per client within one rate-limit window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value = "100")]
    pub rate_limit_max: u32,

    /// Rate-limit window length in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value = "600")]
    pub rate_limit_window_secs: u64,

    /// Extra requests tolerated past the limit before clients are refused
    #[arg(long, env = "RATE_LIMIT_BURST", default_value = "0")]
    pub rate_limit_burst: u32,

    /// Email of the admin account created at startup when missing
    #[arg(long, env = "ADMIN_EMAIL")]
    pub admin_email: Option<String>,

    /// Password of the bootstrap admin account
    #[arg(long, env = "ADMIN_PASSWORD")]
    pub admin_password: Option<String>,
}

impl AppConfig {
    pub fn is_production(&self) -> bool {
        self.node_env.eq_ignore_ascii_case("production")
    }

    pub fn rate_limit(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit_max,
            window: Duration::from_secs(self.rate_limit_window_secs),
            burst: self.rate_limit_burst,
        }
    }

    pub fn cookie_max_age(&self) -> Duration {
        Duration::from_secs(self.jwt_cookie_expire_days.max(0) as u64 * 24 * 3600)
    }

    /// Bootstrap admin credentials, only when both halves are configured.
    pub fn bootstrap_admin(&self) -> Option<(&str, &str)> {
        match (self.admin_email.as_deref(), self.admin_password.as_deref()) {
            (Some(email), Some(password)) if !email.trim().is_empty() && !password.is_empty() => {
                Some((email, password))
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_flags() {
        let config = AppConfig::try_parse_from([
            "vacq",
            "--port",
            "5001",
            "--node-env",
            "development",
            "--rate-limit-max",
            "100",
            "--rate-limit-window-secs",
            "600",
        ])
        .unwrap();

        assert_eq!(config.port, 5001);
        assert!(!config.is_production());

        let limits = config.rate_limit();
        assert_eq!(limits.max_requests, 100);
        assert_eq!(limits.window, Duration::from_secs(600));
        assert_eq!(limits.burst, 0);
    }

    #[test]
    fn test_bootstrap_admin_requires_both_values() {
        let mut config = AppConfig::try_parse_from(["vacq"]).unwrap();
        config.admin_email = Some("root@example.com".to_string());
        config.admin_password = None;
        assert!(config.bootstrap_admin().is_none());

        config.admin_password = Some("secret".to_string());
        assert_eq!(
            config.bootstrap_admin(),
            Some(("root@example.com", "secret"))
        );
    }

    #[test]
    fn test_rate_limit_burst_setting() {
        let config = AppConfig::try_parse_from([
            "vacq",
            "--rate-limit-max",
            "20",
            "--rate-limit-burst",
            "5",
        ])
        .unwrap();

        let limits = config.rate_limit();
        assert_eq!(limits.max_requests, 20);
        assert_eq!(limits.burst, 5);
    }

    #[test]
    fn test_production_mode_detection() {
        let config =
            AppConfig::try_parse_from(["vacq", "--node-env", "Production"]).unwrap();
        assert!(config.is_production());
        assert_eq!(config.cookie_max_age(), Duration::from_secs(30 * 24 * 3600));
    }
}
