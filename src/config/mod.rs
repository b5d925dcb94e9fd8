use crate::utils::password::PasswordScheme;
use std::env;
use std::time::Duration;

/// Runtime configuration for share issuance and delivery
#[derive(Debug, Clone)]
pub struct ShareConfig {
    /// Maximum declared upload size in bytes (default: 100 MB)
    pub max_file_size: u64,

    /// Longest allowed link lifetime in hours (default: 168)
    pub max_ttl_hours: i64,

    /// Validity of a signed upload URL in seconds (default: 7200)
    pub upload_url_ttl_secs: u64,

    /// Validity of a signed download URL in seconds (default: 3600)
    pub download_url_ttl_secs: u64,

    /// Upper bound for any single metadata or blob call (default: 10)
    pub store_timeout_secs: u64,

    /// Interval between background sweeps (default: 3600)
    pub sweep_interval_secs: u64,

    /// Shared secret guarding the sweep trigger. `None` disables the endpoint.
    pub cron_auth_token: Option<String>,

    /// Public base URL used when building links for notifications
    pub app_url: String,

    /// Digest scheme applied to newly issued passwords
    pub password_scheme: PasswordScheme,

    /// Blob backend: "s3" or "memory" (default: "s3")
    pub blob_backend: String,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,

    /// Mailjet API key
    pub mailjet_api_key: Option<String>,
    /// Mailjet API secret
    pub mailjet_api_secret: Option<String>,
    /// Sender address for link notifications
    pub mailjet_from_email: Option<String>,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024, // 100 MB
            max_ttl_hours: 168,
            upload_url_ttl_secs: 7200,
            download_url_ttl_secs: 3600,
            store_timeout_secs: 10,
            sweep_interval_secs: 3600,
            cron_auth_token: None,
            app_url: "http://localhost:3000".to_string(),
            password_scheme: PasswordScheme::Argon2,
            blob_backend: "s3".to_string(),
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            mailjet_api_key: None,
            mailjet_api_secret: None,
            mailjet_from_email: None,
        }
    }
}

impl ShareConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            max_file_size: env::var("MAX_FILE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.max_file_size),

            max_ttl_hours: env::var("MAX_TTL_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v > 0)
                .unwrap_or(default.max_ttl_hours),

            upload_url_ttl_secs: env::var("UPLOAD_URL_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.upload_url_ttl_secs),

            download_url_ttl_secs: env::var("DOWNLOAD_URL_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.download_url_ttl_secs),

            store_timeout_secs: env::var("STORE_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.store_timeout_secs),

            sweep_interval_secs: env::var("SWEEP_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.sweep_interval_secs),

            cron_auth_token: env::var("CRON_AUTH_TOKEN")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            app_url: env::var("APP_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(default.app_url),

            password_scheme: env::var("PASSWORD_SCHEME")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default.password_scheme),

            blob_backend: env::var("BLOB_BACKEND")
                .map(|v| v.to_lowercase())
                .unwrap_or(default.blob_backend),

            allowed_origins: env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or(default.allowed_origins),

            mailjet_api_key: env::var("MAILJET_API_KEY").ok(),
            mailjet_api_secret: env::var("MAILJET_API_SECRET").ok(),
            mailjet_from_email: env::var("MAILJET_FROM_EMAIL").ok(),
        }
    }

    /// Create config for development (in-memory blobs, fixed sweep token)
    pub fn development() -> Self {
        Self {
            cron_auth_token: Some("dev-cron-token".to_string()),
            blob_backend: "memory".to_string(),
            ..Self::default()
        }
    }

    /// Create config for production (sweep token required)
    pub fn production() -> Self {
        let from_env = Self::from_env();
        Self {
            cron_auth_token: Some(
                from_env
                    .cron_auth_token
                    .clone()
                    .expect("CRITICAL: CRON_AUTH_TOKEN must be set"),
            ),
            blob_backend: "s3".to_string(),
            ..from_env
        }
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    pub fn upload_url_ttl(&self) -> Duration {
        Duration::from_secs(self.upload_url_ttl_secs)
    }

    pub fn download_url_ttl(&self) -> Duration {
        Duration::from_secs(self.download_url_ttl_secs)
    }

    pub fn mailjet_configured(&self) -> bool {
        self.mailjet_api_key.is_some()
            && self.mailjet_api_secret.is_some()
            && self.mailjet_from_email.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ShareConfig::default();
        assert_eq!(config.max_file_size, 100 * 1024 * 1024);
        assert_eq!(config.max_ttl_hours, 168);
        assert_eq!(config.password_scheme, PasswordScheme::Argon2);
        assert!(config.cron_auth_token.is_none());
        assert_eq!(config.store_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_development_config() {
        let config = ShareConfig::development();
        assert_eq!(config.blob_backend, "memory");
        assert!(config.cron_auth_token.is_some());
        assert!(!config.mailjet_configured());
    }

    #[test]
    fn test_production_config() {
        unsafe { env::set_var("CRON_AUTH_TOKEN", "test_token") };
        let config = ShareConfig::production();
        unsafe { env::remove_var("CRON_AUTH_TOKEN") };
        assert_eq!(config.cron_auth_token.as_deref(), Some("test_token"));
        assert_eq!(config.blob_backend, "s3");
    }
}
