use crate::config::InstanceSettings;
use crate::domain::model::Record;
use crate::utils::error::{Result, SnowError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

const WRAPPER_KEY: &str = "ANSIBLE_MODULE_ARGS";
const CONTROL_PREFIX: &str = "_ansible_";

/// Module arguments as delivered by Ansible, split into parameters and control flags.
#[derive(Debug, Clone, Default)]
pub struct ModuleArgs {
    pub params: Record,
    pub check_mode: bool,
    pub diff: bool,
}

impl ModuleArgs {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let mut object = match value {
            Value::Object(object) => object,
            other => {
                return Err(SnowError::ArgumentError {
                    message: format!("Module arguments must be a JSON object, got {}", other),
                })
            }
        };

        // Older Ansible versions wrap the arguments in an envelope.
        if let Some(Value::Object(inner)) = object.remove(WRAPPER_KEY) {
            object = inner;
        }

        let mut args = ModuleArgs::default();
        for (key, value) in object {
            match key.strip_prefix(CONTROL_PREFIX) {
                Some("check_mode") => args.check_mode = value.as_bool().unwrap_or(false),
                Some("diff") => args.diff = value.as_bool().unwrap_or(false),
                Some(_) => {}
                None => {
                    args.params.insert(key, value);
                }
            }
        }
        Ok(args)
    }

    /// Connection settings given under the `instance` parameter.
    pub fn instance(&self) -> Result<InstanceSettings> {
        match self.params.get("instance") {
            None | Some(Value::Null) => Ok(InstanceSettings::default()),
            Some(value) => serde_json::from_value(value.clone()).map_err(|e| {
                SnowError::ArgumentError {
                    message: format!("Invalid instance parameters: {}", e),
                }
            }),
        }
    }

    pub fn parse<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.params.clone())).map_err(|e| {
            SnowError::ArgumentError {
                message: format!("Invalid module parameters: {}", e),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Params {
        number: Option<String>,
    }

    #[test]
    fn test_control_flags_are_split_off() {
        let args = ModuleArgs::from_value(json!({
            "number": "RITM0010001",
            "_ansible_check_mode": true,
            "_ansible_diff": true,
            "_ansible_verbosity": 3
        }))
        .unwrap();

        assert!(args.check_mode);
        assert!(args.diff);
        assert_eq!(args.params.len(), 1);
        let params: Params = args.parse().unwrap();
        assert_eq!(params.number.as_deref(), Some("RITM0010001"));
    }

    #[test]
    fn test_wrapped_arguments() {
        let args = ModuleArgs::from_json_str(
            r#"{"ANSIBLE_MODULE_ARGS": {"number": "RITM1", "_ansible_check_mode": false}}"#,
        )
        .unwrap();
        assert!(!args.check_mode);
        assert_eq!(args.params.get("number"), Some(&json!("RITM1")));
    }

    #[test]
    fn test_instance_settings() {
        let args = ModuleArgs::from_value(json!({
            "instance": {"host": "https://dev.service-now.com", "username": "admin"}
        }))
        .unwrap();
        let instance = args.instance().unwrap();
        assert_eq!(instance.host.as_deref(), Some("https://dev.service-now.com"));
        assert_eq!(instance.password, None);

        let bad = ModuleArgs::from_value(json!({"instance": {"timeout": "never"}})).unwrap();
        assert!(bad.instance().is_err());
    }

    #[test]
    fn test_non_object_arguments() {
        assert!(ModuleArgs::from_value(json!([1, 2])).is_err());
    }
}
