//! Configuration types.
//!
//! Every section is built once from the environment in `main` and handed
//! to the component that needs it. Nothing reads process state afterwards.

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default storage location when `INQUIRY_STORE_URL` is unset.
pub const DEFAULT_STORE_URL: &str = "./data/inquiries.db";
pub const DEFAULT_DATABASE_ID: &str = "customer-inquiries";
pub const DEFAULT_CONTAINER_ID: &str = "inquiries";
pub const DEFAULT_THROUGHPUT: u32 = 400;
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Full service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub text_analytics: TextAnalyticsConfig,
    pub store: StoreConfig,
}

impl AppConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            server: ServerConfig::from_lookup(&lookup)?,
            text_analytics: TextAnalyticsConfig::from_lookup(&lookup)?,
            store: StoreConfig::from_lookup(&lookup)?,
        })
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl ServerConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = parse_or(lookup, "INQUIRY_HTTP_PORT", DEFAULT_HTTP_PORT)?;
        Ok(Self { port })
    }
}

/// Text analytics (sentiment) endpoint settings.
#[derive(Debug, Clone)]
pub struct TextAnalyticsConfig {
    /// Base URI of the cognitive services resource, without the API path.
    pub endpoint: String,
    pub api_key: SecretString,
}

impl TextAnalyticsConfig {
    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let endpoint = required(lookup, "COGNITIVE_SERVICES_ENDPOINT_URI")?;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidValue {
                key: "COGNITIVE_SERVICES_ENDPOINT_URI".into(),
                message: format!("expected an http(s) URI, got {endpoint:?}"),
            });
        }
        let api_key = required(lookup, "COGNITIVE_SERVICES_API_KEY")?;
        Ok(Self {
            endpoint,
            api_key: SecretString::from(api_key),
        })
    }
}

/// Document store settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Local file path, `:memory:`, or a `libsql://` / `https://` URL.
    pub url: String,
    /// Auth token for remote databases.
    pub auth_token: Option<SecretString>,
    pub database_id: String,
    pub container_id: String,
    /// Provisioned throughput recorded on the container.
    pub throughput: u32,
}

impl StoreConfig {
    /// Whether `url` points at a remote libSQL server.
    pub fn is_remote(&self) -> bool {
        ["libsql://", "https://", "http://", "wss://", "ws://"]
            .iter()
            .any(|scheme| self.url.starts_with(scheme))
    }

    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self {
            url: non_empty(lookup, "INQUIRY_STORE_URL").unwrap_or_else(|| DEFAULT_STORE_URL.into()),
            auth_token: non_empty(lookup, "INQUIRY_STORE_AUTH_TOKEN").map(SecretString::from),
            database_id: non_empty(lookup, "INQUIRY_STORE_DATABASE_ID")
                .unwrap_or_else(|| DEFAULT_DATABASE_ID.into()),
            container_id: non_empty(lookup, "INQUIRY_STORE_CONTAINER_ID")
                .unwrap_or_else(|| DEFAULT_CONTAINER_ID.into()),
            throughput: parse_or(lookup, "INQUIRY_STORE_THROUGHPUT", DEFAULT_THROUGHPUT)?,
        };

        if config.is_remote() && config.auth_token.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "INQUIRY_STORE_AUTH_TOKEN".into(),
                hint: "Remote store URLs need an auth token.".into(),
            });
        }
        Ok(config)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STORE_URL.into(),
            auth_token: None,
            database_id: DEFAULT_DATABASE_ID.into(),
            container_id: DEFAULT_CONTAINER_ID.into(),
            throughput: DEFAULT_THROUGHPUT,
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required<F>(lookup: &F, key: &str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty(lookup, key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
