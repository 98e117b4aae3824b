pub mod args;
#[cfg(feature = "cli")]
pub mod cli;
pub mod profile;

use crate::utils::error::{Result, SnowError};
use crate::utils::validation::{
    validate_positive_timeout, validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    #[default]
    Password,
    RefreshToken,
}

impl GrantType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantType::Password => "password",
            GrantType::RefreshToken => "refresh_token",
        }
    }

    fn parse(value: &str) -> Result<Self> {
        match value {
            "password" => Ok(GrantType::Password),
            "refresh_token" => Ok(GrantType::RefreshToken),
            other => Err(SnowError::InvalidConfigValueError {
                field: "instance.grant_type".to_string(),
                value: other.to_string(),
                reason: "Expected one of: password, refresh_token".to_string(),
            }),
        }
    }
}

/// Partially specified connection settings, as found in module args, a profile or the environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InstanceSettings {
    pub host: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub grant_type: Option<GrantType>,
    pub timeout: Option<f64>,
}

impl InstanceSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the `SN_*` variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let grant_type = lookup("SN_GRANT_TYPE")
            .map(|value| GrantType::parse(&value))
            .transpose()?;
        let timeout = match lookup("SN_TIMEOUT") {
            Some(value) => Some(value.parse::<f64>().map_err(|_| {
                SnowError::InvalidConfigValueError {
                    field: "SN_TIMEOUT".to_string(),
                    value: value.clone(),
                    reason: "Expected a number of seconds".to_string(),
                }
            })?),
            None => None,
        };

        Ok(Self {
            host: lookup("SN_HOST"),
            username: lookup("SN_USERNAME"),
            password: lookup("SN_PASSWORD"),
            client_id: lookup("SN_CLIENT_ID"),
            client_secret: lookup("SN_CLIENT_SECRET"),
            refresh_token: lookup("SN_REFRESH_TOKEN"),
            grant_type,
            timeout,
        })
    }

    /// Field-wise merge, values already set on `self` win.
    pub fn or(self, fallback: InstanceSettings) -> Self {
        Self {
            host: self.host.or(fallback.host),
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
            client_id: self.client_id.or(fallback.client_id),
            client_secret: self.client_secret.or(fallback.client_secret),
            refresh_token: self.refresh_token.or(fallback.refresh_token),
            grant_type: self.grant_type.or(fallback.grant_type),
            timeout: self.timeout.or(fallback.timeout),
        }
    }

    pub fn resolve(self) -> Result<InstanceConfig> {
        let host = validate_required_field("instance.host", &self.host)?.clone();
        let config = InstanceConfig {
            host,
            username: self.username,
            password: self.password,
            client_id: self.client_id,
            client_secret: self.client_secret,
            refresh_token: self.refresh_token,
            grant_type: self.grant_type.unwrap_or_default(),
            timeout: self.timeout,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Fully resolved connection settings for one ServiceNow instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceConfig {
    pub host: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub refresh_token: Option<String>,
    pub grant_type: GrantType,
    pub timeout: Option<f64>,
}

impl InstanceConfig {
    pub fn uses_oauth(&self) -> bool {
        self.client_id.is_some()
    }
}

impl Validate for InstanceConfig {
    fn validate(&self) -> Result<()> {
        validate_url("instance.host", &self.host)?;

        if let Some(timeout) = self.timeout {
            validate_positive_timeout("instance.timeout", timeout)?;
        }

        if self.client_id.is_some() != self.client_secret.is_some() {
            return Err(SnowError::ConfigError {
                message: "instance.client_id and instance.client_secret must be set together"
                    .to_string(),
            });
        }

        match (self.uses_oauth(), self.grant_type) {
            (true, GrantType::RefreshToken) => {
                validate_required_field("instance.refresh_token", &self.refresh_token)?;
            }
            _ => {
                validate_required_field("instance.username", &self.username)?;
                validate_required_field("instance.password", &self.password)?;
            }
        }

        Ok(())
    }
}
