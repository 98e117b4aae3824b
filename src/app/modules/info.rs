//! Listing shared by the `*_info` modules.

use crate::app::modules::{filter_params, records_value};
use crate::core::attachment::AttachmentClient;
use crate::core::client::QueryParams;
use crate::core::mapper::PayloadMapper;
use crate::core::remap;
use crate::core::table::{self, TableClient};
use crate::core::variable::VariableClient;
use crate::domain::ports::ModuleContext;
use crate::utils::error::Result;
use crate::utils::validation::{validate_mutually_exclusive, Validate};
use serde::Deserialize;
use serde_json::{Map, Value};

/// How a record is selected: by `sys_id`, by `number`, or by a `query`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LookupParams {
    pub sys_id: Option<String>,
    pub number: Option<String>,
    pub query: Option<Vec<Map<String, Value>>>,
}

impl LookupParams {
    fn has_query(&self) -> bool {
        self.query.as_ref().is_some_and(|q| !q.is_empty())
    }
}

impl Validate for LookupParams {
    fn validate(&self) -> Result<()> {
        validate_mutually_exclusive(
            &[
                ("sys_id", self.sys_id.is_some()),
                ("number", self.number.is_some()),
            ],
            ("query", self.query.is_some()),
        )
    }
}

/// Which request item a listed record's variables belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableSource {
    None,
    /// The record is itself a request item.
    OwnSysId,
    /// The record references its request item through this field. A catalog
    /// task's own `sys_id` has no `sc_item_option_mtom` rows, so its variables
    /// are read from the parent item; an empty reference falls back to the
    /// record's own `sys_id`.
    ReferenceField(&'static str),
}

pub async fn build_query(
    lookup: &LookupParams,
    table_client: &TableClient,
    mapper: &PayloadMapper,
) -> Result<QueryParams> {
    match &lookup.query {
        Some(raw) if lookup.has_query() => {
            let encoded = remap::sysparm_query(raw, table_client, mapper).await?;
            tracing::debug!("Encoded query: {}", encoded);
            Ok(table::query_of([("sysparm_query", encoded.as_str())]))
        }
        _ => Ok(filter_params(&[
            ("sys_id", &lookup.sys_id),
            ("number", &lookup.number),
        ])),
    }
}

pub async fn list_with_details(
    ctx: &ModuleContext,
    table_name: &str,
    lookup: &LookupParams,
    mapper: &PayloadMapper,
    variables: VariableSource,
    warnings: &mut Vec<String>,
) -> Result<Vec<Value>> {
    let table_client = TableClient::new(ctx.client.clone());
    let attachment_client = AttachmentClient::new(ctx.client.clone());
    let variable_client = VariableClient::new(table_client.clone());

    let query = build_query(lookup, &table_client, mapper).await?;
    let records = table_client.list_records(table_name, &query).await?;
    tracing::info!("Found {} {} records", records.len(), table_name);

    let mut result = Vec::with_capacity(records.len());
    for record in records {
        let id = table::sys_id(&record)?.to_string();
        let mut output = mapper.to_ansible(&record, warnings);

        let attachments = attachment_client.list_records(table_name, &id).await?;
        output.insert("attachments".to_string(), records_value(attachments));

        let item_id = match variables {
            VariableSource::None => None,
            VariableSource::OwnSysId => Some(id.clone()),
            VariableSource::ReferenceField(field) => Some(
                record
                    .get(field)
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(&id)
                    .to_string(),
            ),
        };
        if let Some(item_id) = item_id {
            let vars = variable_client.list(&item_id).await?;
            output.insert("variables".to_string(), vars.variables_value());
            output.insert("vars".to_string(), vars.vars_value());
        }

        result.push(Value::Object(output));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_validation() {
        let ok: LookupParams = serde_json::from_value(json!({"number": "RITM1"})).unwrap();
        assert!(ok.validate().is_ok());

        let clash: LookupParams =
            serde_json::from_value(json!({"sys_id": "1", "query": [{"state": "= Open"}]}))
                .unwrap();
        assert!(clash.validate().is_err());
    }

    #[test]
    fn test_empty_query_is_not_a_query() {
        let lookup: LookupParams = serde_json::from_value(json!({"query": []})).unwrap();
        assert!(!lookup.has_query());
    }
}
