use crate::core::client::Client;
use crate::domain::model::ModuleOutput;
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Per-invocation state handed to a module by the engine.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub client: Client,
    pub check_mode: bool,
    /// Report before/after state in the result (`_ansible_diff` / `--diff`).
    pub diff: bool,
}

impl ModuleContext {
    pub fn new(client: Client, check_mode: bool, diff: bool) -> Self {
        Self {
            client,
            check_mode,
            diff,
        }
    }
}

#[async_trait]
pub trait Module: Send + Sync {
    type Params: DeserializeOwned + Validate + Send + Sync;

    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &ModuleContext, params: Self::Params) -> Result<ModuleOutput>;
}
