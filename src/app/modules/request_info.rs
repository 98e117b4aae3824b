use crate::app::modules::info::{list_with_details, LookupParams, VariableSource};
use crate::core::mapper::{get_mapper, request_item_mapping};
use crate::domain::model::ModuleOutput;
use crate::domain::ports::{Module, ModuleContext};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub const TABLE: &str = "sc_request";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestInfoParams {
    #[serde(flatten)]
    pub lookup: LookupParams,
    pub change_request_mapping: Option<Value>,
}

impl Validate for RequestInfoParams {
    fn validate(&self) -> Result<()> {
        self.lookup.validate()
    }
}

/// Lists requests (`sc_request`) with their attachments.
pub struct RequestInfoModule;

#[async_trait]
impl Module for RequestInfoModule {
    type Params = RequestInfoParams;

    fn name(&self) -> &'static str {
        "request_info"
    }

    async fn run(&self, ctx: &ModuleContext, params: Self::Params) -> Result<ModuleOutput> {
        let mapper = get_mapper(params.change_request_mapping.as_ref(), request_item_mapping())?;
        let mut warnings = Vec::new();
        let records = list_with_details(
            ctx,
            TABLE,
            &params.lookup,
            &mapper,
            VariableSource::None,
            &mut warnings,
        )
        .await?;

        Ok(ModuleOutput::new(false)
            .with("records", records)
            .with_warnings(warnings))
    }
}
