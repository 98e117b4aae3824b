use crate::app::modules::info::{list_with_details, LookupParams, VariableSource};
use crate::core::mapper::{get_mapper, request_item_mapping};
use crate::domain::model::ModuleOutput;
use crate::domain::ports::{Module, ModuleContext};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

pub const TABLE: &str = "sc_req_item";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestItemInfoParams {
    #[serde(flatten)]
    pub lookup: LookupParams,
    pub request_item_mapping: Option<Value>,
}

impl Validate for RequestItemInfoParams {
    fn validate(&self) -> Result<()> {
        self.lookup.validate()
    }
}

/// Lists request items together with their attachments and catalog variables.
pub struct RequestItemInfoModule;

#[async_trait]
impl Module for RequestItemInfoModule {
    type Params = RequestItemInfoParams;

    fn name(&self) -> &'static str {
        "request_item_info"
    }

    async fn run(&self, ctx: &ModuleContext, params: Self::Params) -> Result<ModuleOutput> {
        let mapper = get_mapper(params.request_item_mapping.as_ref(), request_item_mapping())?;
        let mut warnings = Vec::new();
        let records = list_with_details(
            ctx,
            TABLE,
            &params.lookup,
            &mapper,
            VariableSource::OwnSysId,
            &mut warnings,
        )
        .await?;

        Ok(ModuleOutput::new(false)
            .with("records", records)
            .with_warnings(warnings))
    }
}
