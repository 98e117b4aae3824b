use snow_itsm::app::modules::RequestItemInfoModule;
use snow_itsm::core::engine::run_binary_module;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    run_binary_module(RequestItemInfoModule).await
}
