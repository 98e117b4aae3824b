use anyhow::Context;
use clap::Parser;
use snow_itsm::config::args::ModuleArgs;
use snow_itsm::core::engine::{self, print_output};
use snow_itsm::utils::error::ErrorSeverity;
use snow_itsm::utils::{logger, validation::Validate};
use snow_itsm::{CliConfig, InstanceSettings, ModuleOutput};
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting snow-itsm CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        tracing::error!("Suggestion: {}", e.recovery_suggestion());
        eprintln!("{}", e.user_friendly_message());
        return exit_code(e.severity());
    }

    let output = match load_inputs(&config) {
        Ok((args, fallback)) => config.module.run(&args, fallback).await,
        Err(e) => {
            tracing::error!("Could not load module inputs: {:#}", e);
            ModuleOutput::failure(format!("{:#}", e))
        }
    };
    if output.is_failed() {
        eprintln!("Module failed: {}", output.msg.as_deref().unwrap_or("unknown error"));
    }
    print_output(&output)
}

fn load_inputs(config: &CliConfig) -> anyhow::Result<(ModuleArgs, InstanceSettings)> {
    let profile = config
        .profile
        .clone()
        .or_else(|| std::env::var_os("SN_PROFILE").map(PathBuf::from));
    let (mut args, fallback) = engine::load_inputs(&config.args_file, profile.as_deref())
        .with_context(|| format!("loading {}", config.args_file.display()))?;
    args.check_mode |= config.check;
    args.diff |= config.diff;
    Ok((args, fallback))
}

fn exit_code(severity: ErrorSeverity) -> ExitCode {
    match severity {
        ErrorSeverity::Low => ExitCode::SUCCESS,
        ErrorSeverity::Medium => ExitCode::from(2),
        ErrorSeverity::High => ExitCode::from(1),
        ErrorSeverity::Critical => ExitCode::from(3),
    }
}
