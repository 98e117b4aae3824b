use serde::Serialize;
use serde_json::{Map, Value};

/// A ServiceNow row, keyed by the remote table's column names.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diff {
    pub before: Option<Value>,
    pub after: Option<Value>,
}

impl Diff {
    pub fn new(before: Option<&Record>, after: Option<&Record>) -> Self {
        Self {
            before: before.cloned().map(Value::Object),
            after: after.cloned().map(Value::Object),
        }
    }
}

/// The JSON document a module prints on stdout.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleOutput {
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ModuleOutput {
    pub fn new(changed: bool) -> Self {
        Self {
            changed,
            ..Default::default()
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            failed: Some(true),
            msg: Some(msg.into()),
            ..Default::default()
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Appends warnings, skipping any already reported.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        for warning in warnings {
            if !self.warnings.contains(&warning) {
                self.warnings.push(warning);
            }
        }
        self
    }

    pub fn with_diff(self, diff: Diff) -> Self {
        let value = serde_json::to_value(diff).unwrap_or(Value::Null);
        self.with("diff", value)
    }

    pub fn is_failed(&self) -> bool {
        self.failed.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_output_serializes_flat() {
        let record = json!({"sys_id": "abc"}).as_object().cloned().unwrap();
        let output = ModuleOutput::new(true)
            .with("record", Value::Object(record.clone()))
            .with_diff(Diff::new(None, Some(&record)));

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(
            value,
            json!({
                "changed": true,
                "record": {"sys_id": "abc"},
                "diff": {"before": null, "after": {"sys_id": "abc"}}
            })
        );
    }

    #[test]
    fn test_warnings_are_deduplicated() {
        let output = ModuleOutput::new(false).with_warnings(vec![
            "unknown state".to_string(),
            "unknown state".to_string(),
            "unknown impact".to_string(),
        ]);
        assert_eq!(output.warnings, vec!["unknown state", "unknown impact"]);

        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value["warnings"], json!(["unknown state", "unknown impact"]));
    }

    #[test]
    fn test_failure_output() {
        let output = ModuleOutput::failure("boom");
        assert!(output.is_failed());
        let value = serde_json::to_value(&output).unwrap();
        assert_eq!(value, json!({"changed": false, "failed": true, "msg": "boom"}));
    }
}
