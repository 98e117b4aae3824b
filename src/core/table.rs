use crate::core::client::{Body, Client, QueryParams, Response};
use crate::domain::model::Record;
use crate::utils::error::{Result, SnowError};
use serde_json::Value;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub fn table_path(table: &str, sys_id: Option<&str>) -> String {
    match sys_id {
        Some(sys_id) => format!("api/now/table/{}/{}", table, sys_id),
        None => format!("api/now/table/{}", table),
    }
}

/// Adds the parameters every table request carries.
pub fn with_defaults(query: &QueryParams) -> QueryParams {
    let mut query = query.clone();
    query
        .entry("sysparm_exclude_reference_link".to_string())
        .or_insert_with(|| "true".to_string());
    query
}

pub fn query_of<const N: usize>(pairs: [(&str, &str); N]) -> QueryParams {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn describe_query(query: &QueryParams) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn sys_id(record: &Record) -> Result<&str> {
    record
        .get("sys_id")
        .and_then(Value::as_str)
        .ok_or_else(|| SnowError::ProcessingError {
            message: "Record has no sys_id".to_string(),
        })
}

pub(crate) fn records_from(response: &Response) -> Result<Vec<Record>> {
    match response.result()? {
        Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(record) => Some(record),
                _ => None,
            })
            .collect()),
        other => Err(SnowError::ProcessingError {
            message: format!("Expected a list of records, got {}", other),
        }),
    }
}

pub(crate) fn record_from(response: &Response) -> Result<Record> {
    match response.result()? {
        Value::Object(record) => Ok(record),
        other => Err(SnowError::ProcessingError {
            message: format!("Expected a record, got {}", other),
        }),
    }
}

/// Walks every page of a list endpoint, following `x-total-count`.
pub(crate) async fn paginate(
    client: &Client,
    path: &str,
    query: &QueryParams,
    batch_size: usize,
) -> Result<Vec<Record>> {
    let mut base_query = query.clone();
    base_query.insert("sysparm_limit".to_string(), batch_size.to_string());

    let mut records = Vec::new();
    let mut offset = 0;
    loop {
        let mut page_query = base_query.clone();
        page_query.insert("sysparm_offset".to_string(), offset.to_string());

        let response = client.get(path, Some(&page_query)).await?;
        records.extend(records_from(&response)?);
        offset += batch_size;

        match response.total_count() {
            Some(total) if offset < total => continue,
            _ => break,
        }
    }

    tracing::debug!("Fetched {} records from {}", records.len(), path);
    Ok(records)
}

#[derive(Debug, Clone)]
pub struct TableClient {
    client: Client,
    batch_size: usize,
}

impl TableClient {
    pub fn new(client: Client) -> Self {
        Self::with_batch_size(client, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(client: Client, batch_size: usize) -> Self {
        Self {
            client,
            batch_size: batch_size.max(1),
        }
    }

    pub async fn list_records(&self, table: &str, query: &QueryParams) -> Result<Vec<Record>> {
        paginate(
            &self.client,
            &table_path(table, None),
            &with_defaults(query),
            self.batch_size,
        )
        .await
    }

    pub async fn get_record(
        &self,
        table: &str,
        query: &QueryParams,
        must_exist: bool,
    ) -> Result<Option<Record>> {
        let mut records = self.list_records(table, query).await?;

        if records.len() > 1 {
            return Err(SnowError::MultipleMatches {
                count: records.len(),
                table: table.to_string(),
                query: describe_query(query),
            });
        }
        if must_exist && records.is_empty() {
            return Err(SnowError::NoMatch {
                table: table.to_string(),
                query: describe_query(query),
            });
        }

        Ok(records.pop())
    }

    /// Like [`get_record`](Self::get_record) with `must_exist`, unwrapped.
    pub async fn require_record(&self, table: &str, query: &QueryParams) -> Result<Record> {
        self.get_record(table, query, true)
            .await?
            .ok_or_else(|| SnowError::NoMatch {
                table: table.to_string(),
                query: describe_query(query),
            })
    }

    pub async fn create_record(
        &self,
        table: &str,
        payload: &Record,
        check_mode: bool,
    ) -> Result<Record> {
        if check_mode {
            return Ok(payload.clone());
        }

        let response = self
            .client
            .post(
                &table_path(table, None),
                Body::Json(Value::Object(payload.clone())),
                Some(&with_defaults(&QueryParams::new())),
            )
            .await?;
        let record = record_from(&response)?;
        tracing::info!("Created {} record {}", table, sys_id(&record).unwrap_or("?"));
        Ok(record)
    }

    pub async fn update_record(
        &self,
        table: &str,
        record: &Record,
        payload: &Record,
        check_mode: bool,
    ) -> Result<Record> {
        if check_mode {
            let mut merged = record.clone();
            merged.extend(payload.clone());
            return Ok(merged);
        }

        let id = sys_id(record)?;
        let response = self
            .client
            .patch(
                &table_path(table, Some(id)),
                Value::Object(payload.clone()),
                Some(&with_defaults(&QueryParams::new())),
            )
            .await?;
        tracing::info!("Updated {} record {}", table, id);
        record_from(&response)
    }

    pub async fn delete_record(&self, table: &str, record: &Record, check_mode: bool) -> Result<()> {
        if check_mode {
            return Ok(());
        }

        let id = sys_id(record)?;
        self.client
            .delete(&table_path(table, Some(id)), None)
            .await?;
        tracing::info!("Deleted {} record {}", table, id);
        Ok(())
    }
}

pub async fn find_user(table_client: &TableClient, user_name: &str) -> Result<Record> {
    table_client
        .require_record("sys_user", &query_of([("user_name", user_name)]))
        .await
}

pub async fn find_assignment_group(table_client: &TableClient, name: &str) -> Result<Record> {
    table_client
        .require_record("sys_user_group", &query_of([("name", name)]))
        .await
}

pub async fn find_standard_change_template(
    table_client: &TableClient,
    name: &str,
) -> Result<Record> {
    table_client
        .require_record("std_change_producer_version", &query_of([("name", name)]))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_path() {
        assert_eq!(table_path("sc_req_item", None), "api/now/table/sc_req_item");
        assert_eq!(
            table_path("sc_req_item", Some("abc")),
            "api/now/table/sc_req_item/abc"
        );
    }

    #[test]
    fn test_with_defaults_keeps_caller_value() {
        let query = with_defaults(&QueryParams::new());
        assert_eq!(
            query.get("sysparm_exclude_reference_link").map(String::as_str),
            Some("true")
        );

        let explicit = with_defaults(&query_of([("sysparm_exclude_reference_link", "false")]));
        assert_eq!(
            explicit.get("sysparm_exclude_reference_link").map(String::as_str),
            Some("false")
        );
    }

    #[test]
    fn test_describe_query() {
        let query = query_of([("number", "RITM1"), ("active", "true")]);
        assert_eq!(describe_query(&query), "active=true, number=RITM1");
    }
}
