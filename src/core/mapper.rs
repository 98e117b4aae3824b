use crate::domain::model::Record;
use crate::utils::error::{Result, SnowError};
use serde_json::Value;
use std::collections::HashMap;

/// `field -> [(servicenow code, ansible label)]`
pub type FieldMapping = Vec<(&'static str, Vec<(String, String)>)>;

pub fn request_item_mapping() -> FieldMapping {
    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(snow, label)| (snow.to_string(), label.to_string()))
            .collect()
    }

    vec![
        (
            "priority",
            pairs(&[("1", "critical"), ("2", "high"), ("3", "moderate"), ("4", "low")]),
        ),
        ("impact", pairs(&[("1", "high"), ("2", "medium"), ("3", "low")])),
        ("urgency", pairs(&[("1", "high"), ("2", "medium"), ("3", "low")])),
        (
            "state",
            pairs(&[
                ("-5", "Pending"),
                ("1", "Open"),
                ("2", "Work In Progress"),
                ("3", "Closed Complete"),
                ("4", "Closed Incomplete"),
                ("7", "Closed Skipped"),
            ]),
        ),
    ]
}

/// Translates enumerated field values between ServiceNow codes and Ansible labels.
#[derive(Debug, Clone, Default)]
pub struct PayloadMapper {
    to_snow: HashMap<String, HashMap<String, String>>,
    to_ansible: HashMap<String, HashMap<String, String>>,
}

impl PayloadMapper {
    pub fn new<I>(mapping: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<(String, String)>)>,
    {
        let mut mapper = PayloadMapper::default();
        for (field, pairs) in mapping {
            let forward = mapper.to_ansible.entry(field.clone()).or_default();
            let backward = mapper.to_snow.entry(field).or_default();
            for (snow, label) in pairs {
                forward.insert(snow.clone(), label.clone());
                backward.insert(label, snow);
            }
        }
        mapper
    }

    /// Unknown values are kept as they are and reported in `warnings`.
    pub fn to_snow(&self, payload: &Record, warnings: &mut Vec<String>) -> Record {
        transform(&self.to_snow, payload, warnings)
    }

    pub fn to_ansible(&self, payload: &Record, warnings: &mut Vec<String>) -> Record {
        transform(&self.to_ansible, payload, warnings)
    }

    /// Maps a single label to its ServiceNow code, or returns it unchanged.
    pub fn snow_value(&self, field: &str, value: &str) -> String {
        self.to_snow
            .get(field)
            .and_then(|m| m.get(value))
            .cloned()
            .unwrap_or_else(|| value.to_string())
    }

    pub fn maps(&self, field: &str) -> bool {
        self.to_snow.contains_key(field)
    }
}

fn transform(
    mapping: &HashMap<String, HashMap<String, String>>,
    payload: &Record,
    warnings: &mut Vec<String>,
) -> Record {
    let mut result = payload.clone();
    for (field, value) in payload {
        let Some(values) = mapping.get(field) else {
            continue;
        };
        let Some(key) = value.as_str() else {
            continue;
        };
        match values.get(key) {
            Some(mapped) => {
                result.insert(field.clone(), Value::String(mapped.clone()));
            }
            None if key.is_empty() => {}
            None => {
                let message =
                    format!("Encountered unknown value {} while mapping field {}.", key, field);
                tracing::warn!("{}", message);
                warnings.push(message);
            }
        }
    }
    result
}

/// Builds a mapper from `defaults`, replacing any field the user overrides.
///
/// `overrides` is the raw `*_mapping` module parameter: `{field: {code: label}}`.
pub fn get_mapper(overrides: Option<&Value>, defaults: FieldMapping) -> Result<PayloadMapper> {
    let mut fields: Vec<(String, Vec<(String, String)>)> = defaults
        .into_iter()
        .map(|(field, pairs)| (field.to_string(), pairs))
        .collect();

    let overrides = match overrides {
        None | Some(Value::Null) => None,
        Some(Value::Object(object)) => Some(object),
        Some(other) => {
            return Err(SnowError::ArgumentError {
                message: format!("Mapping must be a dictionary, got {}", other),
            })
        }
    };

    for (field, values) in overrides.into_iter().flatten() {
        let values = match values {
            Value::Null => continue,
            Value::Object(values) => values,
            other => {
                return Err(SnowError::ArgumentError {
                    message: format!("Mapping for {} must be a dictionary, got {}", field, other),
                })
            }
        };
        let pairs = values
            .iter()
            .map(|(snow, label)| {
                let label = match label {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (snow.clone(), label)
            })
            .collect();

        match fields.iter_mut().find(|(name, _)| name == field) {
            Some(entry) => entry.1 = pairs,
            None => fields.push((field.clone(), pairs)),
        }
    }

    Ok(PayloadMapper::new(fields))
}
