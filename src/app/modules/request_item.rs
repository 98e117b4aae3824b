use crate::app::modules::{filter_params, is_superset, records_value};
use crate::core::attachment::{are_changed, transform_metadata_list, AttachmentClient, AttachmentParam};
use crate::core::mapper::{get_mapper, request_item_mapping, PayloadMapper};
use crate::core::table::{self, TableClient};
use crate::core::variable::VariableClient;
use crate::domain::model::{Diff, ModuleOutput, Record};
use crate::domain::ports::{Module, ModuleContext};
use crate::utils::error::{Result, SnowError};
use crate::utils::validation::{missing_from_params_and_remote, Validate};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const TABLE: &str = "sc_req_item";

/// ServiceNow codes of the closed request item states.
const CLOSED_STATES: &[&str] = &["3", "4", "7"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestItemParams {
    pub sys_id: Option<String>,
    pub number: Option<String>,
    pub state: Option<String>,
    pub assignment_group: Option<String>,
    pub priority: Option<String>,
    pub impact: Option<String>,
    pub urgency: Option<String>,
    pub short_description: Option<String>,
    pub description: Option<String>,
    pub close_notes: Option<String>,
    pub other: Option<Map<String, Value>>,
    pub attachments: Option<Vec<AttachmentParam>>,
    pub request_item_mapping: Option<Value>,
}

impl RequestItemParams {
    fn is_absent(&self) -> bool {
        self.state.as_deref() == Some("absent")
    }

    fn direct_fields(&self) -> [(&'static str, &Option<String>); 8] {
        [
            ("state", &self.state),
            ("assignment_group", &self.assignment_group),
            ("priority", &self.priority),
            ("impact", &self.impact),
            ("urgency", &self.urgency),
            ("short_description", &self.short_description),
            ("description", &self.description),
            ("close_notes", &self.close_notes),
        ]
    }
}

impl Validate for RequestItemParams {
    fn validate(&self) -> Result<()> {
        if self.is_absent() && self.sys_id.is_none() && self.number.is_none() {
            return Err(SnowError::ArgumentError {
                message: "state is absent but any of the following are missing: sys_id, number"
                    .to_string(),
            });
        }
        Ok(())
    }
}

/// Creates, updates or deletes a request item (`sc_req_item`).
pub struct RequestItemModule;

#[async_trait]
impl Module for RequestItemModule {
    type Params = RequestItemParams;

    fn name(&self) -> &'static str {
        "request_item"
    }

    async fn run(&self, ctx: &ModuleContext, params: Self::Params) -> Result<ModuleOutput> {
        let clients = Clients::new(ctx);
        let mapper = get_mapper(params.request_item_mapping.as_ref(), request_item_mapping())?;

        let mut warnings = Vec::new();

        let (changed, record, diff) = if params.is_absent() {
            ensure_absent(ctx, &clients, &mapper, &params, &mut warnings).await?
        } else {
            ensure_present(ctx, &clients, &mapper, &params, &mut warnings).await?
        };

        let output = ModuleOutput::new(changed)
            .with("record", record.map(Value::Object).unwrap_or(Value::Null))
            .with_warnings(warnings);
        Ok(if ctx.diff {
            output.with_diff(diff)
        } else {
            output
        })
    }
}

struct Clients {
    table: TableClient,
    attachment: AttachmentClient,
    variable: VariableClient,
}

impl Clients {
    fn new(ctx: &ModuleContext) -> Self {
        let table = TableClient::new(ctx.client.clone());
        Self {
            attachment: AttachmentClient::new(ctx.client.clone()),
            variable: VariableClient::new(table.clone()),
            table,
        }
    }
}

type Outcome = (bool, Option<Record>, Diff);

async fn ensure_absent(
    ctx: &ModuleContext,
    clients: &Clients,
    mapper: &PayloadMapper,
    params: &RequestItemParams,
    warnings: &mut Vec<String>,
) -> Result<Outcome> {
    let query = filter_params(&[("sys_id", &params.sys_id), ("number", &params.number)]);
    let Some(item) = clients.table.get_record(TABLE, &query, false).await? else {
        return Ok((false, None, Diff::default()));
    };

    let id = table::sys_id(&item)?;
    clients
        .attachment
        .delete_attached_records(TABLE, id, ctx.check_mode)
        .await?;
    clients.table.delete_record(TABLE, &item, ctx.check_mode).await?;

    let before = mapper.to_ansible(&item, warnings);
    Ok((true, None, Diff::new(Some(&before), None)))
}

/// Closing a request item needs close notes, either supplied now or already on the record.
fn validate_params(
    params: &RequestItemParams,
    mapper: &PayloadMapper,
    remote: Option<&Record>,
) -> Result<()> {
    let closing = params
        .state
        .as_deref()
        .map(|state| CLOSED_STATES.contains(&mapper.snow_value("state", state).as_str()))
        .unwrap_or(false);
    if !closing {
        return Ok(());
    }

    let mut supplied = Record::new();
    supplied.insert(
        "close_notes".to_string(),
        params.close_notes.clone().map(Value::String).unwrap_or(Value::Null),
    );

    let missing = missing_from_params_and_remote(&["close_notes"], &supplied, remote);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SnowError::MissingParameters(missing))
    }
}

async fn build_payload(params: &RequestItemParams, table_client: &TableClient) -> Result<Record> {
    let mut payload = params.other.clone().unwrap_or_default();
    for (field, value) in params.direct_fields() {
        if let Some(value) = value {
            payload.insert(field.to_string(), Value::String(value.clone()));
        }
    }

    if let Some(group) = &params.assignment_group {
        let group = table::find_assignment_group(table_client, group).await?;
        payload.insert(
            "assignment_group".to_string(),
            Value::String(table::sys_id(&group)?.to_string()),
        );
    }

    Ok(payload)
}

async fn ensure_present(
    ctx: &ModuleContext,
    clients: &Clients,
    mapper: &PayloadMapper,
    params: &RequestItemParams,
    warnings: &mut Vec<String>,
) -> Result<Outcome> {
    let query = filter_params(&[("sys_id", &params.sys_id), ("number", &params.number)]);
    let payload = build_payload(params, &clients.table).await?;
    let attachments =
        transform_metadata_list(params.attachments.as_deref().unwrap_or_default()).await?;

    if query.is_empty() {
        validate_params(params, mapper, None)?;
        let created = clients
            .table
            .create_record(TABLE, &mapper.to_snow(&payload, warnings), ctx.check_mode)
            .await?;
        let mut new = mapper.to_ansible(&created, warnings);

        // check mode never reaches the instance, so there is no sys_id yet
        let new_id = new
            .get("sys_id")
            .and_then(Value::as_str)
            .unwrap_or("N/A")
            .to_string();
        let uploaded = clients
            .attachment
            .upload_records(TABLE, &new_id, &attachments, ctx.check_mode)
            .await?;
        new.insert("attachments".to_string(), records_value(uploaded));

        return Ok((true, Some(new.clone()), Diff::new(None, Some(&new))));
    }

    let remote = clients.table.require_record(TABLE, &query).await?;
    let mut old = mapper.to_ansible(&remote, warnings);
    let old_id = table::sys_id(&old)?.to_string();

    let old_attachments = clients.attachment.list_records(TABLE, &old_id).await?;
    old.insert(
        "attachments".to_string(),
        records_value(old_attachments.clone()),
    );

    let variables = clients.variable.list(&old_id).await?;
    old.insert("variables".to_string(), variables.variables_value());
    old.insert("vars".to_string(), variables.vars_value());

    if is_superset(&old, &payload) && !are_changed(&old_attachments, &attachments) {
        tracing::info!("Request item {} is up to date", old_id);
        return Ok((false, Some(old.clone()), Diff::new(Some(&old), Some(&old))));
    }

    validate_params(params, mapper, Some(&old))?;
    let updated = clients
        .table
        .update_record(
            TABLE,
            &mapper.to_snow(&old, warnings),
            &mapper.to_snow(&payload, warnings),
            ctx.check_mode,
        )
        .await?;
    let mut new = mapper.to_ansible(&updated, warnings);

    let attachments = clients
        .attachment
        .update_records(TABLE, &old_id, &attachments, &old_attachments, ctx.check_mode)
        .await?;
    new.insert("attachments".to_string(), records_value(attachments));
    // variables are read-only through this module
    new.insert("variables".to_string(), variables.variables_value());
    new.insert("vars".to_string(), variables.vars_value());

    Ok((true, Some(new.clone()), Diff::new(Some(&old), Some(&new))))
}
