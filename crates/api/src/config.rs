//! Process configuration, read from `GATEWARDEN_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

use gatewarden_auth::{BearerScheme, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH, TokenConfig};

pub const JWT_SECRET: &str = "GATEWARDEN_JWT_SECRET";
pub const ACCESS_TTL_SECS: &str = "GATEWARDEN_ACCESS_TTL_SECS";
pub const REFRESH_TTL_SECS: &str = "GATEWARDEN_REFRESH_TTL_SECS";
pub const AUTH_HEADER: &str = "GATEWARDEN_AUTH_HEADER";
pub const BEARER_PREFIX: &str = "GATEWARDEN_BEARER_PREFIX";
pub const LOGIN_PATH: &str = "GATEWARDEN_LOGIN_PATH";
pub const REFRESH_PATH: &str = "GATEWARDEN_REFRESH_PATH";
pub const BIND_ADDR: &str = "GATEWARDEN_BIND_ADDR";
pub const USERS_FILE: &str = "GATEWARDEN_USERS_FILE";
pub const DISCLOSE_ACCOUNTS: &str = "GATEWARDEN_DISCLOSE_ACCOUNTS";
pub const DATABASE_URL: &str = "GATEWARDEN_DATABASE_URL";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has an invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

#[derive(Clone)]
pub struct GatewayConfig {
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    pub auth_header: String,
    pub bearer_prefix: String,
    pub login_path: String,
    pub refresh_path: String,
    pub bind_addr: SocketAddr,
    pub users_file: Option<PathBuf>,
    pub disclose_accounts: bool,
    pub database_url: Option<String>,
}

impl GatewayConfig {
    /// Defaults for everything except the signing key.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 7200,
            auth_header: "Authorization".to_string(),
            bearer_prefix: "Bearer ".to_string(),
            login_path: DEFAULT_LOGIN_PATH.to_string(),
            refresh_path: DEFAULT_REFRESH_PATH.to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            users_file: None,
            disclose_accounts: false,
            database_url: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds the configuration from any `name -> value` source. Empty
    /// values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());

        let secret = get(JWT_SECRET).ok_or(ConfigError::Missing(JWT_SECRET))?;
        let mut config = Self::with_secret(secret);

        if let Some(v) = get(ACCESS_TTL_SECS) {
            config.access_ttl_secs = parse(ACCESS_TTL_SECS, &v)?;
        }
        if let Some(v) = get(REFRESH_TTL_SECS) {
            config.refresh_ttl_secs = parse(REFRESH_TTL_SECS, &v)?;
        }
        if let Some(v) = get(AUTH_HEADER) {
            config.auth_header = v.trim().to_string();
        }
        // The prefix usually ends in a space, so it is taken verbatim.
        if let Some(v) = lookup(BEARER_PREFIX).filter(|v| !v.is_empty()) {
            config.bearer_prefix = v;
        }
        if let Some(v) = get(LOGIN_PATH) {
            config.login_path = path(LOGIN_PATH, v)?;
        }
        if let Some(v) = get(REFRESH_PATH) {
            config.refresh_path = path(REFRESH_PATH, v)?;
        }
        if config.refresh_path == config.login_path {
            return Err(ConfigError::Invalid {
                var: REFRESH_PATH,
                value: config.refresh_path,
            });
        }
        if let Some(v) = get(BIND_ADDR) {
            config.bind_addr = parse(BIND_ADDR, &v)?;
        }
        config.users_file = get(USERS_FILE).map(PathBuf::from);
        if let Some(v) = get(DISCLOSE_ACCOUNTS) {
            config.disclose_accounts = parse(DISCLOSE_ACCOUNTS, &v.to_ascii_lowercase())?;
        }
        config.database_url = get(DATABASE_URL);

        Ok(config)
    }

    pub fn token_config(&self) -> TokenConfig {
        TokenConfig::new(self.jwt_secret.clone()).with_ttls(self.access_ttl_secs, self.refresh_ttl_secs)
    }

    pub fn bearer_scheme(&self) -> BearerScheme {
        BearerScheme::new(self.auth_header.clone(), self.bearer_prefix.clone())
    }
}

impl core::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("auth_header", &self.auth_header)
            .field("bearer_prefix", &self.bearer_prefix)
            .field("login_path", &self.login_path)
            .field("refresh_path", &self.refresh_path)
            .field("bind_addr", &self.bind_addr)
            .field("users_file", &self.users_file)
            .field("disclose_accounts", &self.disclose_accounts)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn parse<T: core::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}

fn path(var: &'static str, value: String) -> Result<String, ConfigError> {
    let value = value.trim().to_string();
    if !value.starts_with('/') {
        return Err(ConfigError::Invalid { var, value });
    }
    Ok(value)
}
