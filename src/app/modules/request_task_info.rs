use crate::app::modules::info::{list_with_details, LookupParams, VariableSource};
use crate::core::mapper::{get_mapper, request_item_mapping};
use crate::domain::model::ModuleOutput;
use crate::domain::ports::{Module, ModuleContext};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub const TABLE: &str = "sc_task";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestTaskInfoParams {
    #[serde(flatten)]
    pub lookup: LookupParams,
    pub change_request_mapping: Option<Value>,
}

impl Validate for RequestTaskInfoParams {
    fn validate(&self) -> Result<()> {
        self.lookup.validate()
    }
}

/// Lists catalog tasks; variables come from the task's parent request item.
pub struct RequestTaskInfoModule;

#[async_trait]
impl Module for RequestTaskInfoModule {
    type Params = RequestTaskInfoParams;

    fn name(&self) -> &'static str {
        "request_task_info"
    }

    async fn run(&self, ctx: &ModuleContext, params: Self::Params) -> Result<ModuleOutput> {
        let mapper = get_mapper(params.change_request_mapping.as_ref(), request_item_mapping())?;
        let mut warnings = Vec::new();
        let records = list_with_details(
            ctx,
            TABLE,
            &params.lookup,
            &mapper,
            VariableSource::ReferenceField("request_item"),
            &mut warnings,
        )
        .await?;

        Ok(ModuleOutput::new(false)
            .with("records", records)
            .with_warnings(warnings))
    }
}
