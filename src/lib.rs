pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use app::modules::ModuleKind;
pub use config::{args::ModuleArgs, InstanceConfig, InstanceSettings};
pub use core::client::Client;
pub use core::engine::ModuleEngine;
pub use domain::model::{ModuleOutput, Record};
pub use domain::ports::{Module, ModuleContext};
pub use utils::error::{Result, SnowError};
