//! Client configuration.
//!
//! Connection settings come either from explicit construction or from the
//! process environment (the `NIRA_*` variables), matching how deployments of
//! the registry facade hand out integration credentials. The endpoint URL is
//! always derived from the configured host and path; the facade is reachable
//! over plain HTTP inside the operator's network.

use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Environment variable holding the account name.
pub const ENV_USERNAME: &str = "NIRA_USERNAME";
/// Environment variable holding the account password.
pub const ENV_PASSWORD: &str = "NIRA_PASSWORD";
/// Environment variable holding the server host (and optional port).
pub const ENV_SERVER: &str = "NIRA_SERVER";
/// Environment variable holding the facade path below the server root.
pub const ENV_SERVER_PATH: &str = "NIRA_SERVER_PATH";
/// Environment variable holding the facade target namespace.
pub const ENV_NAMESPACE: &str = "NIRA_NAMESPACE";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("invalid value for environment variable: {0}")]
    InvalidValue(&'static str),

    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Connection settings for the registry SOAP facade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NiraConfig {
    /// Account name issued by the registry operator.
    pub username: String,
    /// Current account password; it is hashed into the request digest and
    /// never sent in the clear.
    pub password: String,
    /// Host and optional port of the registry server, e.g. `10.0.4.23:8080`.
    pub server: String,
    /// Path of the SOAP facade below the server root.
    pub server_path: String,
    /// Target namespace of the facade service.
    pub namespace: String,
}

impl NiraConfig {
    /// Creates a configuration from explicit values.
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        server: impl Into<String>,
        server_path: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            server: server.into(),
            server_path: server_path.into(),
            namespace: namespace.into(),
        }
    }

    /// Loads the configuration from `NIRA_*` environment variables.
    ///
    /// All five variables are required. A `NIRA_SERVER` value carrying a
    /// URL scheme is reported against the variable; the loaded
    /// configuration is then validated before it is returned.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            username: require(ENV_USERNAME)?,
            password: require(ENV_PASSWORD)?,
            server: require(ENV_SERVER)?,
            server_path: require(ENV_SERVER_PATH)?,
            namespace: require(ENV_NAMESPACE)?,
        };
        if config.server.contains("://") {
            return Err(ConfigError::InvalidValue(ENV_SERVER));
        }
        config.validate()?;
        Ok(config)
    }

    /// Validates that the configuration can produce a usable endpoint and
    /// security header.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("username", &self.username),
            ("password", &self.password),
            ("server", &self.server),
            ("server_path", &self.server_path),
            ("namespace", &self.namespace),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "{name} must not be empty"
                )));
            }
        }
        if self.server.contains("://") {
            return Err(ConfigError::Validation(
                "server must be a bare host, without a URL scheme".to_string(),
            ));
        }
        Ok(())
    }

    /// Full URL of the SOAP endpoint derived from server and path.
    pub fn endpoint_url(&self) -> String {
        format!(
            "http://{}/{}",
            self.server.trim_end_matches('/'),
            self.server_path.trim_start_matches('/')
        )
    }

    /// The username and password pair used for WS-Security digests.
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

/// Username and password pair fed into the WS-Security digest computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Creates a credential pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::MissingEnvVar(name))
}
