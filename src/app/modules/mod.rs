pub mod cmdb_relationship;
pub mod info;
pub mod request_info;
pub mod request_item;
pub mod request_item_info;
pub mod request_task_info;

use crate::config::args::ModuleArgs;
use crate::config::InstanceSettings;
use crate::core::client::QueryParams;
use crate::core::engine::ModuleEngine;
use crate::domain::model::{ModuleOutput, Record};
use serde_json::Value;

pub use cmdb_relationship::CmdbRelationshipModule;
pub use request_info::RequestInfoModule;
pub use request_item::RequestItemModule;
pub use request_item_info::RequestItemInfoModule;
pub use request_task_info::RequestTaskInfoModule;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum ModuleKind {
    #[cfg_attr(feature = "cli", value(name = "request_item"))]
    RequestItem,
    #[cfg_attr(feature = "cli", value(name = "request_item_info"))]
    RequestItemInfo,
    #[cfg_attr(feature = "cli", value(name = "request_info"))]
    RequestInfo,
    #[cfg_attr(feature = "cli", value(name = "request_task_info"))]
    RequestTaskInfo,
    #[cfg_attr(feature = "cli", value(name = "cmdb_relationship"))]
    CmdbRelationship,
}

impl ModuleKind {
    pub async fn run(self, args: &ModuleArgs, fallback: InstanceSettings) -> ModuleOutput {
        match self {
            ModuleKind::RequestItem => {
                ModuleEngine::new(RequestItemModule)
                    .with_fallback(fallback)
                    .run(args)
                    .await
            }
            ModuleKind::RequestItemInfo => {
                ModuleEngine::new(RequestItemInfoModule)
                    .with_fallback(fallback)
                    .run(args)
                    .await
            }
            ModuleKind::RequestInfo => {
                ModuleEngine::new(RequestInfoModule)
                    .with_fallback(fallback)
                    .run(args)
                    .await
            }
            ModuleKind::RequestTaskInfo => {
                ModuleEngine::new(RequestTaskInfoModule)
                    .with_fallback(fallback)
                    .run(args)
                    .await
            }
            ModuleKind::CmdbRelationship => {
                ModuleEngine::new(CmdbRelationshipModule)
                    .with_fallback(fallback)
                    .run(args)
                    .await
            }
        }
    }
}

/// Query parameters for the given fields that are set.
pub(crate) fn filter_params(fields: &[(&str, &Option<String>)]) -> QueryParams {
    fields
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name.to_string(), v.clone())))
        .collect()
}

/// True when every field of `candidate` has the same value in `superset`.
pub(crate) fn is_superset(superset: &Record, candidate: &Record) -> bool {
    candidate
        .iter()
        .all(|(key, value)| superset.get(key) == Some(value))
}

pub(crate) fn records_value(records: Vec<Record>) -> Value {
    Value::Array(records.into_iter().map(Value::Object).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_filter_params() {
        let sys_id = Some("abc".to_string());
        let number = None;
        let query = filter_params(&[("sys_id", &sys_id), ("number", &number)]);
        assert_eq!(query.len(), 1);
        assert_eq!(query.get("sys_id").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_is_superset() {
        let remote = record(json!({"state": "Open", "impact": "low", "sys_id": "1"}));
        assert!(is_superset(&remote, &record(json!({}))));
        assert!(is_superset(&remote, &record(json!({"state": "Open"}))));
        assert!(!is_superset(&remote, &record(json!({"state": "Closed Complete"}))));
        assert!(!is_superset(&remote, &record(json!({"urgency": "low"}))));
    }
}
