use crate::core::client::{Body, Client};
use crate::core::table::{self, TableClient};
use crate::domain::model::{ModuleOutput, Record};
use crate::domain::ports::{Module, ModuleContext};
use crate::utils::error::{Result, SnowError};
use crate::utils::validation::{validate_non_empty_string, Validate};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const TYPES_PATH: &str = "api/now/cmdbrelation/types";
const ADD_PATH: &str = "api/now/cmdbrelation/add-rels";
const DELETE_PATH: &str = "api/now/cmdbrelation/delete-rels";
const RELATION_TABLE: &str = "cmdb_rel_ci";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipState {
    #[default]
    Present,
    Absent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    CiDownstream,
    CiUpstream,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CmdbRelationshipParams {
    #[serde(default)]
    pub state: RelationshipState,
    pub relationship_name: String,
    pub relationship_type: RelationshipType,
    pub parent_ci_name: String,
    pub parent_ci_class_name: String,
    pub child_ci_name_list: Vec<String>,
    pub child_ci_class_name: String,
}

impl Validate for CmdbRelationshipParams {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("relationship_name", &self.relationship_name)?;
        validate_non_empty_string("parent_ci_name", &self.parent_ci_name)?;
        validate_non_empty_string("parent_ci_class_name", &self.parent_ci_class_name)?;
        validate_non_empty_string("child_ci_class_name", &self.child_ci_class_name)?;
        // an empty child list would turn into a query matching every CI of the class
        if self.child_ci_name_list.is_empty() {
            return Err(SnowError::ArgumentError {
                message: "child_ci_name_list must contain at least one CI name".to_string(),
            });
        }
        for name in &self.child_ci_name_list {
            validate_non_empty_string("child_ci_name_list", name)?;
        }
        Ok(())
    }
}

/// One parent/child edge in the shape the `cmdbrelation` API expects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relation {
    #[serde(rename = "type")]
    pub type_name: String,
    pub type_id: String,
    pub child: String,
    pub child_id: String,
    pub parent: String,
    pub parent_id: String,
    pub sys_id: String,
    #[serde(rename = "relationshipType")]
    pub relationship_type: RelationshipType,
}

/// Creates or removes CMDB relationships between a parent CI and a set of child CIs.
pub struct CmdbRelationshipModule;

fn str_field(record: &Record, field: &str) -> String {
    record
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Some endpoints return JSON documents embedded as strings.
fn embedded_json(value: Value) -> Result<Value> {
    match value {
        Value::String(s) => Ok(serde_json::from_str(&s)?),
        other => Ok(other),
    }
}

pub async fn relationship_type_id(client: &Client, name: &str) -> Result<Option<String>> {
    let result = client.get(TYPES_PATH, None).await?.result()?;
    let types = embedded_json(result.get("types").cloned().unwrap_or(Value::Null))?;

    Ok(types.as_array().and_then(|types| {
        types
            .iter()
            .find(|t| t.get("name").and_then(Value::as_str) == Some(name))
            .and_then(|t| t.get("sys_id").and_then(Value::as_str))
            .map(str::to_string)
    }))
}

/// Returns the existing relation's sys_id, if there is one.
pub async fn existing_relation(table_client: &TableClient, relation: &Relation) -> Result<Option<String>> {
    let query = format!(
        "child={}^parent={}^type={}",
        relation.child_id, relation.parent_id, relation.type_id
    );
    let rows = table_client
        .list_records(
            RELATION_TABLE,
            &table::query_of([
                ("sysparm_query", query.as_str()),
                ("sysparm_fields", "parent,child,type,sys_id"),
            ]),
        )
        .await?;

    match rows.as_slice() {
        [] => Ok(None),
        [row] => Ok(Some(str_field(row, "sys_id"))),
        _ => Err(SnowError::ProcessingError {
            message: format!("{} query returned too many rows ({})", RELATION_TABLE, rows.len()),
        }),
    }
}

fn child_query(names: &[String]) -> String {
    names
        .iter()
        .map(|name| format!("name={}", name))
        .collect::<Vec<_>>()
        .join("^OR")
}

async fn create_relations(client: &Client, relations: &[Relation]) -> Result<Value> {
    let payload = json!({
        "item": serde_json::to_string(relations)?,
        "type": "cmdb_ci",
        "isSuggestedRelationship": true,
    });
    let result = client
        .post(
            ADD_PATH,
            Body::Json(payload),
            Some(&table::with_defaults(&Default::default())),
        )
        .await?
        .result()?;
    embedded_json(result.get("message").cloned().unwrap_or(Value::Null))
}

async fn delete_relations(client: &Client, relations: &[Relation]) -> Result<Value> {
    let sys_ids = relations
        .iter()
        .map(|r| r.sys_id.as_str())
        .collect::<Vec<_>>()
        .join(",");
    let result = client
        .delete(
            DELETE_PATH,
            Some(&table::query_of([("sysIds", sys_ids.as_str()), ("type", "cmdb_ci")])),
        )
        .await?
        .result()?;
    embedded_json(result.get("message").cloned().unwrap_or(Value::Null))
}

fn api_status(response: &Value) -> (bool, String) {
    let ok = response.get("status").and_then(Value::as_str) == Some("OK");
    let message = response
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    (ok, message)
}

#[async_trait]
impl Module for CmdbRelationshipModule {
    type Params = CmdbRelationshipParams;

    fn name(&self) -> &'static str {
        "cmdb_relationship"
    }

    async fn run(&self, ctx: &ModuleContext, params: Self::Params) -> Result<ModuleOutput> {
        let table_client = TableClient::new(ctx.client.clone());

        let type_id = relationship_type_id(&ctx.client, &params.relationship_name)
            .await?
            .ok_or_else(|| SnowError::ProcessingError {
                message: format!("Error getting relationship id: {}", params.relationship_name),
            })?;

        let parents = table_client
            .list_records(
                &params.parent_ci_class_name,
                &table::query_of([
                    ("name", params.parent_ci_name.as_str()),
                    ("sysparm_fields", "name,sys_id"),
                ]),
            )
            .await?;
        let parent_id = match parents.as_slice() {
            [parent] => str_field(parent, "sys_id"),
            _ => {
                return Err(SnowError::ProcessingError {
                    message: format!(
                        "Error getting parent id: got {} results for CI {}",
                        parents.len(),
                        params.parent_ci_name
                    ),
                })
            }
        };

        let query = child_query(&params.child_ci_name_list);
        let children = table_client
            .list_records(
                &params.child_ci_class_name,
                &table::query_of([
                    ("sysparm_query", query.as_str()),
                    ("sysparm_fields", "name,sys_id"),
                ]),
            )
            .await?;

        let mut relations = Vec::new();
        for child in &children {
            let mut relation = Relation {
                type_name: params.relationship_name.clone(),
                type_id: type_id.clone(),
                child: str_field(child, "name"),
                child_id: str_field(child, "sys_id"),
                parent: params.parent_ci_name.clone(),
                parent_id: parent_id.clone(),
                sys_id: String::new(),
                relationship_type: params.relationship_type,
            };
            let existing = existing_relation(&table_client, &relation).await?;
            let wanted = match (params.state, existing) {
                (RelationshipState::Present, None) => true,
                (RelationshipState::Absent, Some(sys_id)) => {
                    relation.sys_id = sys_id;
                    true
                }
                _ => false,
            };
            if wanted {
                relations.push(relation);
            }
        }
        tracing::info!(
            "{} of {} relationships need changes",
            relations.len(),
            params.child_ci_name_list.len()
        );

        let mut output = ModuleOutput::new(!relations.is_empty())
            .with("relations_requested_changes", params.child_ci_name_list.len())
            .with("relations_created", 0)
            .with("relations_deleted", 0)
            .with("relations_changed_detail", serde_json::to_value(&relations)?);

        if relations.is_empty() {
            output.msg = Some(
                match params.state {
                    RelationshipState::Present => "No new relationship to create",
                    RelationshipState::Absent => "No relationship to delete",
                }
                .to_string(),
            );
            return Ok(output);
        }
        if ctx.check_mode {
            return Ok(output);
        }

        let (response, result_key, count_key, verb) = match params.state {
            RelationshipState::Present => (
                create_relations(&ctx.client, &relations).await?,
                "relations_create_api_result",
                "relations_created",
                "creating",
            ),
            RelationshipState::Absent => (
                delete_relations(&ctx.client, &relations).await?,
                "relations_delete_api_result",
                "relations_deleted",
                "removing",
            ),
        };

        let (ok, message) = api_status(&response);
        output = output.with(result_key, response);
        if ok {
            output = output.with(count_key, relations.len());
            output.msg = Some(message);
        } else {
            output.failed = Some(true);
            output.msg = Some(format!("Error {} relationship: {}", verb, message));
        }
        Ok(output)
    }
}
