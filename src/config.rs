use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::constants::expiry::MAX_SECONDS;
use crate::domain::ParentPolicy;

/// Placeholder secret shipped in the default config. Refused by `validate`
/// unless explicitly overridden.
pub const DEFAULT_TOKEN_SECRET: &str = "kinship-dev-secret-change-me";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub observability: ObservabilityConfig,

    pub security: SecurityConfig,

    pub registration: RegistrationConfig,

    pub tokens: TokenConfig,

    pub sweeper: SweeperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Argon2 memory cost in KiB (default: 8192 = 8MB)
    pub argon2_memory_cost_kib: u32,

    /// Argon2 time cost (iterations)
    pub argon2_time_cost: u32,

    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,

    /// Minimum accepted password length at registration.
    pub min_password_length: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            argon2_memory_cost_kib: 8192,
            argon2_time_cost: 3,
            argon2_parallelism: 1,
            min_password_length: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub metrics_enabled: bool,

    pub loki_enabled: bool,

    pub loki_url: String,

    pub loki_labels: std::collections::HashMap<String, String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        let mut labels = std::collections::HashMap::new();
        labels.insert("app".to_string(), "kinship".to_string());

        Self {
            metrics_enabled: true,
            loki_enabled: false,
            loki_url: "http://localhost:3100".to_string(),
            loki_labels: labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec![
                "http://localhost:8000".to_string(),
                "http://127.0.0.1:8000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/kinship.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    /// How long an issued OTP stays valid.
    pub otp_expiry_seconds: u64,

    /// How long a pending registration waits for its OTP.
    pub pending_expiry_seconds: u64,

    /// What to do with a parent referral code that does not resolve.
    pub parent_policy: ParentPolicy,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            otp_expiry_seconds: 600,
            pending_expiry_seconds: 600,
            parent_policy: ParentPolicy::Strict,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// HMAC secret for signing tokens.
    pub secret: String,

    pub access_ttl_minutes: i64,

    pub refresh_ttl_minutes: i64,

    /// Allow the placeholder secret (local development only).
    pub allow_insecure_secret: bool,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_TOKEN_SECRET.to_string(),
            access_ttl_minutes: 5,
            refresh_ttl_minutes: 24 * 60,
            allow_insecure_secret: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SweeperConfig {
    pub enabled: bool,

    /// Six-field cron expression (with seconds).
    pub cron_expression: String,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cron_expression: "0 */5 * * * *".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            observability: ObservabilityConfig::default(),
            security: SecurityConfig::default(),
            registration: RegistrationConfig::default(),
            tokens: TokenConfig::default(),
            sweeper: SweeperConfig::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                let mut config = Self::load_from_path(path)?;
                config.apply_env_overrides();
                return Ok(config);
            }
        }

        info!("No config file found, using defaults");
        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// `KINSHIP_DATABASE_URL`, `KINSHIP_TOKEN_SECRET` and `KINSHIP_PORT`
    /// take precedence over the file.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("KINSHIP_DATABASE_URL") {
            self.general.database_path = url;
        }

        if let Ok(secret) = std::env::var("KINSHIP_TOKEN_SECRET") {
            self.tokens.secret = secret;
        }

        if let Ok(port) = std::env::var("KINSHIP_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => warn!("Ignoring invalid KINSHIP_PORT '{port}': {e}"),
            }
        }
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![];

        paths.push(PathBuf::from("config.toml"));

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("kinship").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".kinship").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tokens.secret.is_empty() {
            anyhow::bail!("Token secret cannot be empty");
        }

        if self.tokens.secret == DEFAULT_TOKEN_SECRET && !self.tokens.allow_insecure_secret {
            anyhow::bail!(
                "Token secret is the shipped placeholder; set tokens.secret or KINSHIP_TOKEN_SECRET"
            );
        }

        if self.tokens.access_ttl_minutes <= 0 || self.tokens.refresh_ttl_minutes <= 0 {
            anyhow::bail!("Token lifetimes must be positive");
        }

        if self.registration.otp_expiry_seconds == 0 {
            anyhow::bail!("OTP expiry must be > 0");
        }

        if self.registration.pending_expiry_seconds == 0 {
            anyhow::bail!("Pending registration expiry must be > 0");
        }

        if self.registration.otp_expiry_seconds > MAX_SECONDS
            || self.registration.pending_expiry_seconds > MAX_SECONDS
        {
            anyhow::bail!("Expiry settings cannot exceed {MAX_SECONDS} seconds");
        }

        if self.general.min_db_connections > self.general.max_db_connections {
            anyhow::bail!("min_db_connections cannot exceed max_db_connections");
        }

        if self.security.min_password_length == 0 {
            anyhow::bail!("min_password_length must be > 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.registration.otp_expiry_seconds, 600);
        assert_eq!(config.registration.parent_policy, ParentPolicy::Strict);
        assert_eq!(config.tokens.access_ttl_minutes, 5);
        assert_eq!(config.security.min_password_length, 8);
        assert!(config.sweeper.enabled);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[registration]"));
        assert!(toml_str.contains("[tokens]"));
        assert!(toml_str.contains("parent_policy = \"strict\""));
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [registration]
            parent_policy = "lenient"
            otp_expiry_seconds = 120
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.registration.parent_policy, ParentPolicy::Lenient);
        assert_eq!(config.registration.otp_expiry_seconds, 120);
        assert_eq!(config.registration.pending_expiry_seconds, 600);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_validate_rejects_placeholder_secret() {
        let config = Config::default();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.tokens.allow_insecure_secret = true;
        assert!(config.validate().is_ok());

        let mut config = Config::default();
        config.tokens.secret = "a-real-secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_expiry() {
        let mut config = Config::default();
        config.tokens.secret = "a-real-secret".to_string();
        config.registration.otp_expiry_seconds = 0;
        assert!(config.validate().is_err());
    }
}
