use crate::config::InstanceSettings;
use crate::utils::error::{Result, SnowError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Connection defaults kept in a TOML file, e.g.
///
/// ```toml
/// [instance]
/// host = "https://${SN_INSTANCE}.service-now.com"
/// username = "automation"
/// password = "${SN_PASSWORD}"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InstanceProfile {
    #[serde(default)]
    pub instance: InstanceSettings,
}

impl InstanceProfile {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        tracing::debug!("Loaded instance profile from {}", path.as_ref().display());
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// Replaces `${VAR}` with the environment value; unknown variables are left as written.
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| SnowError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}
