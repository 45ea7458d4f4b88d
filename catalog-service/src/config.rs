//! Configuration management using Figment
//!
//! Configuration is loaded from multiple sources with the following precedence (highest to lowest):
//! 1. Environment variables (prefix: CATALOG_, nested keys separated by `__`)
//! 2. Current working directory: ./config.toml
//! 3. XDG config directory: ~/.config/catalog-service/{service_name}/config.toml
//! 4. System directory: /etc/catalog-service/{service_name}/config.toml
//! 5. Default values
//!
//! ```toml
//! [service]
//! name = "catalog-service"
//! environment = "production"
//!
//! [jwt]
//! secret = "change-me"
//!
//! [pagination]
//! default_limit = 10
//! ```
//!
//! `CATALOG_JWT__SECRET=change-me` sets the same secret from the environment.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::middleware::DEFAULT_TOKEN_HEADER;
use crate::query::DEFAULT_LIMIT;

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "CATALOG_";

/// Directory name under the XDG and system config roots
const CONFIG_DIR: &str = "catalog-service";

/// Environment name that hides diagnostic traces
pub const PRODUCTION: &str = "production";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Service configuration
    #[serde(default)]
    pub service: ServiceConfig,

    /// Token verification and issuance
    #[serde(default)]
    pub jwt: JwtConfig,

    /// List endpoint defaults
    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Service name
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Log level or `EnvFilter` directive
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Environment (development, staging, production)
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl ServiceConfig {
    /// Whether the service runs in production
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case(PRODUCTION)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
            environment: default_environment(),
        }
    }
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Shared signing secret, required before serving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// JWT algorithm (HS256, HS384, HS512)
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,

    /// Request header carrying the token
    #[serde(default = "default_token_header")]
    pub header: String,

    /// JWT issuer to set and validate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// JWT audience to set and validate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,

    /// Lifetime of issued tokens in seconds
    #[serde(default = "default_token_lifetime")]
    pub token_lifetime_secs: u64,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: None,
            algorithm: default_jwt_algorithm(),
            header: default_token_header(),
            issuer: None,
            audience: None,
            token_lifetime_secs: default_token_lifetime(),
        }
    }
}

/// Pagination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    /// Page size when a request names none
    #[serde(default = "default_limit")]
    pub default_limit: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

// Default value functions
fn default_service_name() -> String {
    CONFIG_DIR.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

fn default_jwt_algorithm() -> String {
    "HS256".to_string()
}

fn default_token_header() -> String {
    DEFAULT_TOKEN_HEADER.to_string()
}

fn default_token_lifetime() -> u64 {
    24 * 60 * 60
}

fn default_limit() -> u64 {
    DEFAULT_LIMIT
}

impl Config {
    /// Load configuration from all sources
    ///
    /// The service name is inferred from the binary name.
    pub fn load() -> Result<Self> {
        let service_name = std::env::current_exe()
            .ok()
            .and_then(|p| p.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_else(|| CONFIG_DIR.to_string());

        Self::load_for_service(&service_name)
    }

    /// Load configuration for a specific service name
    pub fn load_for_service(service_name: &str) -> Result<Self> {
        let config_paths = Self::find_config_paths(service_name);

        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        // Lowest priority first so later files override earlier ones
        for path in config_paths.iter().rev() {
            if path.exists() {
                tracing::info!("Loading configuration from: {}", path.display());
                figment = figment.merge(Toml::file(path));
            }
        }

        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;
        Ok(config)
    }

    /// Load configuration from a specific file, plus environment overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        Ok(config)
    }

    /// Candidate config files, highest priority first
    fn find_config_paths(service_name: &str) -> Vec<PathBuf> {
        let config_file_path = Path::new(service_name).join("config.toml");
        let mut paths = vec![PathBuf::from("config.toml")];

        let xdg_dirs = xdg::BaseDirectories::with_prefix(CONFIG_DIR);
        if let Some(path) = xdg_dirs.find_config_file(&config_file_path) {
            paths.push(path);
        }

        paths.push(Path::new("/etc").join(CONFIG_DIR).join(config_file_path));
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service.log_level, "info");
        assert!(!config.service.is_production());
        assert_eq!(config.jwt.algorithm, "HS256");
        assert_eq!(config.jwt.header, "token");
        assert_eq!(config.jwt.token_lifetime_secs, 86_400);
        assert!(config.jwt.secret.is_none());
        assert_eq!(config.pagination.default_limit, 2);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[service]
name = "books"
environment = "Production"

[jwt]
secret = "from-file"
issuer = "catalog"

[pagination]
default_limit = 25
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.service.name, "books");
        assert!(config.service.is_production());
        assert_eq!(config.jwt.secret.as_deref(), Some("from-file"));
        assert_eq!(config.jwt.issuer.as_deref(), Some("catalog"));
        assert_eq!(config.jwt.algorithm, "HS256");
        assert_eq!(config.pagination.default_limit, 25);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[pagination]\ndefault_limit = \"many\"").unwrap();

        let result = Config::load_from(file.path());
        assert!(matches!(result, Err(crate::Error::Config(_))));
    }

    #[test]
    fn test_config_paths_order() {
        let paths = Config::find_config_paths("books");
        assert_eq!(paths.first(), Some(&PathBuf::from("config.toml")));
        assert_eq!(
            paths.last(),
            Some(&PathBuf::from("/etc/catalog-service/books/config.toml"))
        );
    }
}
