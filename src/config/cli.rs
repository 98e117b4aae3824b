use crate::app::modules::ModuleKind;
use crate::utils::error::{Result, SnowError};
use crate::utils::validation::{validate_path, Validate};
use clap::Parser;
use std::path::PathBuf;

/// Runs a single module outside of Ansible, against an args file.
#[derive(Debug, Clone, Parser)]
#[command(name = "snow-itsm")]
#[command(about = "Manage ServiceNow ITSM records the way the Ansible modules do")]
pub struct CliConfig {
    #[arg(value_enum, help = "Module to run")]
    pub module: ModuleKind,

    #[arg(help = "JSON file with the module arguments")]
    pub args_file: PathBuf,

    #[arg(long, help = "Report what would change without changing anything")]
    pub check: bool,

    #[arg(long, help = "Include before/after state in the result")]
    pub diff: bool,

    #[arg(long, help = "TOML profile with instance settings (defaults to $SN_PROFILE)")]
    pub profile: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("args_file", &self.args_file.to_string_lossy())?;
        if !self.args_file.is_file() {
            return Err(SnowError::ConfigError {
                message: format!("Arguments file not found: {}", self.args_file.display()),
            });
        }
        if let Some(profile) = &self.profile {
            if !profile.is_file() {
                return Err(SnowError::ConfigError {
                    message: format!("Profile not found: {}", profile.display()),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_arguments() {
        let config = CliConfig::try_parse_from([
            "snow-itsm",
            "request_item_info",
            "args.json",
            "--check",
            "-v",
        ])
        .unwrap();
        assert_eq!(config.module, ModuleKind::RequestItemInfo);
        assert_eq!(config.args_file, PathBuf::from("args.json"));
        assert!(config.check);
        assert!(!config.diff);
        assert!(config.verbose);
    }

    #[test]
    fn test_unknown_module_rejected() {
        assert!(CliConfig::try_parse_from(["snow-itsm", "change_request", "args.json"]).is_err());
    }

    #[test]
    fn test_validate_requires_existing_files() {
        let args = NamedTempFile::new().unwrap();
        let mut config = CliConfig {
            module: ModuleKind::RequestItem,
            args_file: args.path().to_path_buf(),
            check: false,
            diff: false,
            profile: None,
            verbose: false,
        };
        assert!(config.validate().is_ok());

        config.profile = Some(PathBuf::from("/nonexistent/profile.toml"));
        assert!(config.validate().is_err());

        config.profile = None;
        config.args_file = PathBuf::from("/nonexistent/args.json");
        assert!(config.validate().is_err());
    }
}
