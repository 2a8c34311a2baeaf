use serde::Deserialize;
use std::path::Path;

use crate::vault::codec::MIN_SECRET_CHARS;

/// Vendor production endpoint.
pub const DEFAULT_BASE_URL: &str = "https://developer.atomberg-iot.com";

/// Top-level configuration parsed from TOML.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Deployment context. Production marks the session cookie `Secure`.
/// Accepts the same spellings from TOML and `ATOMSYNC_ENV`.
#[derive(Debug, Default, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(try_from = "String")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "development" | "dev" => Ok(Environment::Development),
            other => Err(format!(
                "environment must be 'development' or 'production' (got '{other}')"
            )),
        }
    }

    pub fn is_production(self) -> bool {
        self == Environment::Production
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Environment::parse(&value)
    }
}

/// Server-level configuration.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub environment: Environment,
    /// Browser origin allowed to call the API with credentials.
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Shared secret the session key is derived from.
    #[serde(default)]
    pub auth_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: Environment::default(),
            cors_origin: default_cors_origin(),
            auth_secret: String::new(),
        }
    }
}

/// Vendor API configuration.
#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Connect and request timeout for vendor calls (seconds).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

/// Load and validate config, applying environment variable overrides.
///
/// Without a file every field takes its default and the secret must come
/// from `ATOMSYNC_AUTH_SECRET`.
pub fn load_config(path: Option<&Path>) -> Result<Config, String> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                format!("Failed to read config file '{}': {}", path.display(), e)
            })?;
            parse_config(&content)?
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate(&mut config)?;

    Ok(config)
}

fn parse_config(content: &str) -> Result<Config, String> {
    toml::from_str(content).map_err(|e| format!("Failed to parse TOML config: {e}"))
}

/// Apply environment variable overrides.
fn apply_env_overrides(
    config: &mut Config,
    var: impl Fn(&str) -> Option<String>,
) -> Result<(), String> {
    if let Some(val) = var("ATOMSYNC_AUTH_SECRET") {
        config.server.auth_secret = val;
    }
    if let Some(val) = var("ATOMSYNC_BASE_URL") {
        config.upstream.base_url = val;
    }
    if let Some(val) = var("ATOMSYNC_ENV") {
        config.server.environment = Environment::parse(&val)?;
    }
    if let Some(val) = var("ATOMSYNC_CORS_ORIGIN") {
        config.server.cors_origin = val;
    }
    Ok(())
}

/// Validate the configuration, normalizing the base URL in place.
fn validate(config: &mut Config) -> Result<(), String> {
    validate_server(&config.server)?;
    validate_upstream(&mut config.upstream, config.server.environment)?;
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), String> {
    if server.auth_secret.is_empty() {
        return Err(
            "server.auth_secret is required (or set ATOMSYNC_AUTH_SECRET). Generate with: openssl rand -base64 32"
                .to_string(),
        );
    }

    let chars = server.auth_secret.chars().count();
    if chars < MIN_SECRET_CHARS {
        return Err(format!(
            "server.auth_secret must be at least {MIN_SECRET_CHARS} characters (got {chars})"
        ));
    }

    if server.cors_origin.is_empty() {
        return Err("server.cors_origin must not be empty".to_string());
    }

    Ok(())
}

fn validate_upstream(upstream: &mut UpstreamConfig, env: Environment) -> Result<(), String> {
    let trimmed = upstream.base_url.trim_end_matches('/').to_string();
    let parsed = url::Url::parse(&trimmed)
        .map_err(|e| format!("upstream.base_url is not a valid URL: {e}"))?;

    match parsed.scheme() {
        "https" => {}
        "http" if env.is_production() => {
            tracing::warn!("upstream.base_url uses http:// in production");
        }
        "http" => {}
        other => {
            return Err(format!(
                "upstream.base_url must be an http(s) URL (got scheme '{other}')"
            ));
        }
    }
    upstream.base_url = trimmed;

    if upstream.timeout_secs == 0 {
        return Err("upstream.timeout_secs must be greater than zero".to_string());
    }

    Ok(())
}
