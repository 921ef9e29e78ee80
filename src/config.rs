//! Server configuration.
//!
//! [`ServerConfig`] is the engine configuration with explicit defaults,
//! validated once before the server is built. [`Config`] reads the process
//! configuration from environment variables.

use anyhow::Result;
use atproto_identity::key::{KeyData, KeyType, generate_key, identify_key};
use std::collections::BTreeSet;
use url::Url;

use crate::errors::ConfigError;
use crate::oauth::types::ResponseType;

/// Upper bound for every configured validity period.
pub const MAX_VALIDITY_DAYS: i64 = 365;

/// Connector id reserved for the local password database connector.
pub const LOCAL_CONNECTOR: &str = "local";

/// Engine configuration for the authorization flow.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// External URL of the server; endpoints are served under its path
    pub issuer: Url,
    pub supported_response_types: BTreeSet<ResponseType>,
    pub id_tokens_valid_for: chrono::Duration,
    pub auth_requests_valid_for: chrono::Duration,
    pub auth_codes_valid_for: chrono::Duration,
    /// Treat every authenticated request as approved
    pub skip_approval: bool,
}

impl ServerConfig {
    /// Configuration with default values for everything but the issuer.
    pub fn new(issuer: &str) -> Result<Self, ConfigError> {
        let issuer =
            Url::parse(issuer).map_err(|e| ConfigError::InvalidIssuer(format!("{}: {}", issuer, e)))?;
        Ok(Self {
            issuer,
            supported_response_types: BTreeSet::from([ResponseType::Code]),
            id_tokens_valid_for: chrono::Duration::hours(24),
            auth_requests_valid_for: chrono::Duration::hours(24),
            auth_codes_valid_for: chrono::Duration::minutes(30),
            skip_approval: false,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.issuer.scheme(), "http" | "https") || self.issuer.host().is_none() {
            return Err(ConfigError::InvalidIssuer(format!(
                "{} must be an absolute http(s) URL",
                self.issuer
            )));
        }
        if self.issuer.query().is_some() || self.issuer.fragment().is_some() {
            return Err(ConfigError::InvalidIssuer(format!(
                "{} must not have a query or fragment",
                self.issuer
            )));
        }
        if self.supported_response_types.is_empty() {
            return Err(ConfigError::NoResponseTypes);
        }
        for (name, validity) in [
            ("id tokens", self.id_tokens_valid_for),
            ("authorization requests", self.auth_requests_valid_for),
            ("authorization codes", self.auth_codes_valid_for),
        ] {
            if validity <= chrono::Duration::zero() {
                return Err(ConfigError::InvalidValidity(name.to_string()));
            }
            if validity > chrono::Duration::days(MAX_VALIDITY_DAYS) {
                return Err(ConfigError::ValidityTooLong(
                    name.to_string(),
                    MAX_VALIDITY_DAYS,
                ));
            }
        }
        if self.auth_codes_valid_for > self.auth_requests_valid_for {
            return Err(ConfigError::CodeOutlivesRequest);
        }
        Ok(())
    }

    /// Issuer as a string without a trailing slash; this is the `iss` claim.
    pub fn issuer_str(&self) -> String {
        self.issuer.as_str().trim_end_matches('/').to_string()
    }

    /// Path prefix of the issuer, empty when the issuer is served at the root.
    pub fn issuer_path(&self) -> String {
        self.issuer.path().trim_end_matches('/').to_string()
    }

    /// Absolute URL for an endpoint path.
    pub fn abs_url(&self, path: &str) -> String {
        format!("{}{}", self.issuer_str(), path)
    }

    /// Absolute path on this host for an endpoint path.
    pub fn abs_path(&self, path: &str) -> String {
        format!("{}{}", self.issuer_path(), path)
    }
}

/// HTTP server port configuration
#[derive(Clone)]
pub struct HttpPort(u16);

/// Token signing keys configuration
#[derive(Clone, Default)]
pub struct PrivateKeys(Vec<KeyData>);

/// Supported response types configuration
#[derive(Clone)]
pub struct SupportedResponseTypes(BTreeSet<ResponseType>);

/// Validity period configuration, parsed with `duration-str`
#[derive(Clone, Copy)]
pub struct Validity(chrono::Duration);

/// Boolean flag configuration
#[derive(Clone, Copy)]
pub struct Flag(bool);

/// CORS origins for the discovery, keys, token and user-info endpoints
#[derive(Clone, Default)]
pub struct AllowedOrigins(Vec<String>);

/// Built-in connectors to enable
#[derive(Clone, Default)]
pub struct EnabledConnectors(Vec<String>);

/// Main application configuration
#[derive(Clone)]
pub struct Config {
    pub version: String,
    pub http_port: HttpPort,
    pub http_templates_path: String,
    pub issuer: String,
    pub supported_response_types: SupportedResponseTypes,
    pub id_token_validity: Validity,
    pub auth_request_validity: Validity,
    pub auth_code_validity: Validity,
    pub skip_approval: Flag,
    pub allowed_origins: AllowedOrigins,
    pub signing_keys: PrivateKeys,
    pub clients_file: Option<String>,
    pub connectors: EnabledConnectors,
    pub storage_backend: String,
    pub database_url: Option<String>,
}

impl Config {
    /// Create a new configuration from environment variables
    pub fn new() -> Result<Self> {
        let issuer = require_env("ISSUER")?;
        let http_port: HttpPort = default_env("HTTP_PORT", "5556").try_into()?;
        let http_templates_path = optional_env("HTTP_TEMPLATES_PATH")
            .unwrap_or_else(|| format!("{}/templates", env!("CARGO_MANIFEST_DIR")));
        let supported_response_types: SupportedResponseTypes =
            default_env("SUPPORTED_RESPONSE_TYPES", "code").try_into()?;
        let id_token_validity: Validity = default_env("ID_TOKEN_VALIDITY", "24h").try_into()?;
        let auth_request_validity: Validity =
            default_env("AUTH_REQUEST_VALIDITY", "24h").try_into()?;
        let auth_code_validity: Validity = default_env("AUTH_CODE_VALIDITY", "30m").try_into()?;
        let skip_approval: Flag = default_env("SKIP_APPROVAL", "false").try_into()?;
        let allowed_origins: AllowedOrigins = optional_env("ALLOWED_ORIGINS").into();
        let signing_keys: PrivateKeys = optional_env("SIGNING_KEYS").try_into()?;
        let clients_file = optional_env("CLIENTS_FILE");
        let connectors: EnabledConnectors = optional_env("CONNECTORS").into();
        let storage_backend = default_env("STORAGE_BACKEND", "memory");
        let database_url = optional_env("DATABASE_URL");

        Ok(Self {
            version: version()?,
            http_port,
            http_templates_path,
            issuer,
            supported_response_types,
            id_token_validity,
            auth_request_validity,
            auth_code_validity,
            skip_approval,
            allowed_origins,
            signing_keys,
            clients_file,
            connectors,
            storage_backend,
            database_url,
        })
    }

    /// Engine configuration derived from this process configuration.
    pub fn server_config(&self) -> Result<ServerConfig, ConfigError> {
        let mut server_config = ServerConfig::new(&self.issuer)?;
        server_config.supported_response_types = self.supported_response_types.0.clone();
        server_config.id_tokens_valid_for = self.id_token_validity.0;
        server_config.auth_requests_valid_for = self.auth_request_validity.0;
        server_config.auth_codes_valid_for = self.auth_code_validity.0;
        server_config.skip_approval = self.skip_approval.0;
        server_config.validate()?;
        Ok(server_config)
    }
}

/// Get application version from build environment
pub fn version() -> Result<String> {
    option_env!("GIT_HASH")
        .or(option_env!("CARGO_PKG_VERSION"))
        .map(|val| val.to_string())
        .ok_or(ConfigError::VersionNotSet.into())
}

fn require_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| ConfigError::EnvVarRequired(name.to_string()).into())
}

pub(crate) fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn default_env(name: &str, default_value: &str) -> String {
    optional_env(name).unwrap_or_else(|| default_value.to_string())
}

fn split_list(value: Option<String>, separator: char) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(separator)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl TryFrom<String> for HttpPort {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value
            .parse::<u16>()
            .map(Self)
            .map_err(|err| ConfigError::PortParsingFailed(err).into())
    }
}

impl AsRef<u16> for HttpPort {
    fn as_ref(&self) -> &u16 {
        &self.0
    }
}

impl TryFrom<Option<String>> for PrivateKeys {
    type Error = anyhow::Error;

    fn try_from(value: Option<String>) -> Result<Self, Self::Error> {
        let mut keys = Vec::new();
        for key_str in split_list(value, ';') {
            keys.push(identify_key(&key_str)?);
        }

        if keys.is_empty() {
            tracing::warn!("no SIGNING_KEYS configured, generating an ephemeral P-256 key");
            keys.push(generate_key(KeyType::P256Private)?);
        }

        Ok(Self(keys))
    }
}

impl AsRef<Vec<KeyData>> for PrivateKeys {
    fn as_ref(&self) -> &Vec<KeyData> {
        &self.0
    }
}

impl TryFrom<String> for SupportedResponseTypes {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let mut response_types = BTreeSet::new();
        for name in value.split([',', ' ']).map(str::trim).filter(|s| !s.is_empty()) {
            let response_type = name
                .parse::<ResponseType>()
                .map_err(|_| ConfigError::UnsupportedResponseType(name.to_string()))?;
            response_types.insert(response_type);
        }
        if response_types.is_empty() {
            return Err(ConfigError::NoResponseTypes);
        }
        Ok(Self(response_types))
    }
}

impl AsRef<BTreeSet<ResponseType>> for SupportedResponseTypes {
    fn as_ref(&self) -> &BTreeSet<ResponseType> {
        &self.0
    }
}

impl TryFrom<String> for Validity {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let duration = duration_str::parse(&value)
            .map_err(|e| ConfigError::DurationParsingFailed(value, e.to_string()))?;
        Ok(Self(chrono::Duration::from_std(duration)?))
    }
}

impl AsRef<chrono::Duration> for Validity {
    fn as_ref(&self) -> &chrono::Duration {
        &self.0
    }
}

impl TryFrom<String> for Flag {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Self(true)),
            "false" | "0" | "no" | "off" => Ok(Self(false)),
            _ => Err(ConfigError::BoolParsingFailed(value).into()),
        }
    }
}

impl AsRef<bool> for Flag {
    fn as_ref(&self) -> &bool {
        &self.0
    }
}

impl From<Option<String>> for AllowedOrigins {
    fn from(value: Option<String>) -> Self {
        Self(split_list(value, ','))
    }
}

impl AsRef<Vec<String>> for AllowedOrigins {
    fn as_ref(&self) -> &Vec<String> {
        &self.0
    }
}

impl From<Option<String>> for EnabledConnectors {
    fn from(value: Option<String>) -> Self {
        Self(split_list(value, ','))
    }
}

impl AsRef<Vec<String>> for EnabledConnectors {
    fn as_ref(&self) -> &Vec<String> {
        &self.0
    }
}
