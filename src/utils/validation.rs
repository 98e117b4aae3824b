use crate::domain::model::Record;
use crate::utils::error::{Result, SnowError};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(SnowError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(SnowError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(SnowError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(SnowError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(SnowError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_required_field<'a, T>(field_name: &str, value: &'a Option<T>) -> Result<&'a T> {
    value.as_ref().ok_or_else(|| SnowError::MissingConfigError {
        field: field_name.to_string(),
    })
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(SnowError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_positive_timeout(field_name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SnowError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Timeout must be a positive number of seconds".to_string(),
        });
    }
    Ok(())
}

/// Fails when `other` is set together with any of `fields`.
pub fn validate_mutually_exclusive(
    pairs: &[(&str, bool)],
    other: (&str, bool),
) -> Result<()> {
    if !other.1 {
        return Ok(());
    }
    for (name, present) in pairs {
        if *present {
            return Err(SnowError::ArgumentError {
                message: format!("parameters are mutually exclusive: {}|{}", name, other.0),
            });
        }
    }
    Ok(())
}

fn is_blank(value: Option<&serde_json::Value>) -> bool {
    match value {
        None | Some(serde_json::Value::Null) => true,
        Some(serde_json::Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Fields that are neither supplied in `params` nor already set on the remote record.
pub fn missing_from_params_and_remote(
    fields: &[&str],
    params: &Record,
    remote: Option<&Record>,
) -> Vec<String> {
    fields
        .iter()
        .filter(|field| {
            is_blank(params.get(**field)) && is_blank(remote.and_then(|r| r.get(**field)))
        })
        .map(|field| field.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("instance.host", "https://dev.service-now.com").is_ok());
        assert!(validate_url("instance.host", "http://localhost:8080").is_ok());
        assert!(validate_url("instance.host", "").is_err());
        assert!(validate_url("instance.host", "dev.service-now.com").is_err());
        assert!(validate_url("instance.host", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_positive_timeout() {
        assert!(validate_positive_timeout("instance.timeout", 10.0).is_ok());
        assert!(validate_positive_timeout("instance.timeout", 0.0).is_err());
        assert!(validate_positive_timeout("instance.timeout", f64::NAN).is_err());
    }

    #[test]
    fn test_mutually_exclusive() {
        assert!(validate_mutually_exclusive(&[("sys_id", true)], ("query", false)).is_ok());
        assert!(validate_mutually_exclusive(&[("sys_id", false)], ("query", true)).is_ok());
        let err = validate_mutually_exclusive(&[("sys_id", false), ("number", true)], ("query", true))
            .unwrap_err();
        assert_eq!(err.to_string(), "parameters are mutually exclusive: number|query");
    }

    #[test]
    fn test_missing_from_params_and_remote() {
        let params = record(json!({"close_notes": null, "state": "Closed Complete"}));
        assert_eq!(
            missing_from_params_and_remote(&["close_notes"], &params, None),
            vec!["close_notes".to_string()]
        );

        let remote = record(json!({"close_notes": "done"}));
        assert!(missing_from_params_and_remote(&["close_notes"], &params, Some(&remote)).is_empty());

        let empty_remote = record(json!({"close_notes": ""}));
        assert_eq!(
            missing_from_params_and_remote(&["close_notes"], &params, Some(&empty_remote)).len(),
            1
        );
    }
}
