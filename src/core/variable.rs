use crate::core::table::{self, TableClient};
use crate::domain::model::Record;
use crate::utils::error::Result;
use serde::Serialize;
use serde_json::Value;

/// Catalog variable type codes and their labels.
pub const VARIABLE_TYPES: &[(&str, &str)] = &[
    ("", ""),
    ("1", "Yes/No"),
    ("2", "Multi_Line_Text"),
    ("3", "Multiple_Choice"),
    ("4", "Numeric_cale"),
    ("5", "Select_Box"),
    ("6", "Single_Line_Text"),
    ("7", "CheckBox"),
    ("8", "Reference"),
    ("9", "Date"),
    ("10", "Date/Time"),
    ("11", "Label"),
    ("12", "Break"),
    ("14", "Custom"),
    ("15", "UI_Page"),
    ("16", "Wide Single Line Text"),
    ("17", "Custom_with_Label"),
    ("18", "Lookup_Select_Box"),
    ("19", "Container Start"),
    ("20", "Container End"),
    ("21", "List_Collector"),
    ("22", "Lookup_Multiple_Choice"),
    ("23", "HTML"),
    ("24", "Container Split"),
    ("25", "Masked"),
    ("26", "Email"),
    ("27", "URL"),
    ("28", "IP_Address"),
    ("29", "Duration"),
    ("30", "Time"),
    ("31", "Requested_For"),
    ("32", "Rich_Text_Label"),
    ("33", "Attachment"),
];

pub fn map_type(code: &str) -> &'static str {
    VARIABLE_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
        .unwrap_or("unknown")
}

/// The question definition (`item_option_new`) next to the answer (`sc_item_option`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableEntry {
    pub name: Record,
    pub value: Record,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSummary {
    pub order: Value,
    pub active: Value,
    pub name: Value,
    #[serde(rename = "type")]
    pub type_: String,
    pub mandatory: Value,
    pub read_only: Value,
    pub question_text: Value,
    pub description: Value,
    pub value: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Variables {
    pub variables: Vec<VariableEntry>,
    pub vars: Vec<VariableSummary>,
}

impl Variables {
    pub fn variables_value(&self) -> Value {
        serde_json::to_value(&self.variables).unwrap_or(Value::Array(Vec::new()))
    }

    pub fn vars_value(&self) -> Value {
        serde_json::to_value(&self.vars).unwrap_or(Value::Array(Vec::new()))
    }
}

fn get(record: &Record, field: &str) -> Value {
    record.get(field).cloned().unwrap_or(Value::Null)
}

fn str_field<'a>(record: &'a Record, field: &str) -> &'a str {
    record.get(field).and_then(Value::as_str).unwrap_or_default()
}

/// Numeric sort key of a variable; rows without a usable order go last.
pub fn order_key(value: &Value) -> i64 {
    match value {
        Value::Number(n) => n.as_i64().unwrap_or(i64::MAX),
        Value::String(s) => s.trim().parse().unwrap_or(i64::MAX),
        _ => i64::MAX,
    }
}

pub fn summarize(name: &Record, value: &Record) -> VariableSummary {
    VariableSummary {
        order: get(value, "order"),
        active: get(name, "active"),
        name: get(name, "name"),
        type_: map_type(str_field(name, "type")).to_string(),
        mandatory: get(name, "mandatory"),
        read_only: get(name, "read_only"),
        question_text: get(name, "question_text"),
        description: get(name, "description"),
        value: get(value, "value"),
    }
}

/// Sorts both views by the answer's `order`; ties keep fetch order.
pub fn assemble(pairs: Vec<(Record, Record)>) -> Variables {
    let mut pairs = pairs;
    pairs.sort_by_key(|(_, value)| order_key(&get(value, "order")));

    let vars = pairs
        .iter()
        .map(|(name, value)| summarize(name, value))
        .collect();
    let variables = pairs
        .into_iter()
        .map(|(name, value)| VariableEntry { name, value })
        .collect();

    Variables { variables, vars }
}

#[derive(Debug, Clone)]
pub struct VariableClient {
    table_client: TableClient,
}

impl VariableClient {
    pub fn new(table_client: TableClient) -> Self {
        Self { table_client }
    }

    /// Variables of the request item `sys_id`, joined across the three catalog tables.
    pub async fn list(&self, sys_id: &str) -> Result<Variables> {
        let links = self
            .table_client
            .list_records("sc_item_option_mtom", &table::query_of([("request_item", sys_id)]))
            .await?;

        let mut pairs = Vec::with_capacity(links.len());
        for link in &links {
            let option_id = str_field(link, "sc_item_option");
            let value = self
                .table_client
                .require_record("sc_item_option", &table::query_of([("sys_id", option_id)]))
                .await?;

            let question_id = str_field(&value, "item_option_new");
            let name = self
                .table_client
                .require_record("item_option_new", &table::query_of([("sys_id", question_id)]))
                .await?;

            pairs.push((name, value));
        }

        tracing::debug!("Collected {} variables for {}", pairs.len(), sys_id);
        Ok(assemble(pairs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_map_type() {
        assert_eq!(map_type("6"), "Single_Line_Text");
        assert_eq!(map_type("33"), "Attachment");
        assert_eq!(map_type(""), "");
        assert_eq!(map_type("13"), "unknown");
        assert_eq!(map_type("99"), "unknown");
    }

    #[test]
    fn test_order_key() {
        assert_eq!(order_key(&json!("100")), 100);
        assert_eq!(order_key(&json!(" 7 ")), 7);
        assert_eq!(order_key(&json!(3)), 3);
        assert_eq!(order_key(&json!("")), i64::MAX);
        assert_eq!(order_key(&Value::Null), i64::MAX);
    }

    #[test]
    fn test_assemble_sorts_numerically() {
        let question = |n: &str, t: &str| {
            record(json!({
                "name": n, "type": t, "active": "true", "mandatory": "false",
                "read_only": "false", "question_text": format!("{}?", n), "description": ""
            }))
        };
        let answer = |order: &str, v: &str| record(json!({"order": order, "value": v}));

        let variables = assemble(vec![
            (question("software", "6"), answer("10", "oracle")),
            (question("urgent", "1"), answer("2", "true")),
            (question("notes", "2"), answer("", "n/a")),
            (question("size", "5"), answer("9", "large")),
        ]);

        let names: Vec<&str> = variables
            .vars
            .iter()
            .map(|v| v.name.as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["urgent", "size", "software", "notes"]);
        assert_eq!(variables.vars[0].type_, "Yes/No");
        assert_eq!(variables.vars[1].value, json!("large"));
        assert_eq!(variables.variables[2].name["name"], json!("software"));
        assert_eq!(variables.variables[2].value["value"], json!("oracle"));
    }

    #[test]
    fn test_summary_serialization() {
        let summary = summarize(
            &record(json!({"name": "software", "type": "6"})),
            &record(json!({"order": "1", "value": "oracle"})),
        );
        let value = serde_json::to_value(&summary).unwrap();
        assert_eq!(value["type"], json!("Single_Line_Text"));
        assert_eq!(value["value"], json!("oracle"));
        assert_eq!(value["mandatory"], Value::Null);
    }
}
