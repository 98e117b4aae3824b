use crate::config::args::ModuleArgs;
use crate::config::profile::InstanceProfile;
use crate::config::InstanceSettings;
use crate::core::client::Client;
use crate::domain::model::ModuleOutput;
use crate::domain::ports::{Module, ModuleContext};
use crate::utils::error::{Result, SnowError};
use crate::utils::logger;
use crate::utils::validation::Validate;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Drives one module invocation: arguments in, a single JSON document out.
pub struct ModuleEngine<M: Module> {
    module: M,
    fallback: InstanceSettings,
}

impl<M: Module> ModuleEngine<M> {
    pub fn new(module: M) -> Self {
        Self {
            module,
            fallback: InstanceSettings::default(),
        }
    }

    /// Settings used for any `instance` field the module arguments leave out.
    pub fn with_fallback(mut self, fallback: InstanceSettings) -> Self {
        self.fallback = fallback;
        self
    }

    pub async fn execute(&self, args: &ModuleArgs) -> Result<ModuleOutput> {
        tracing::info!("Running module {}", self.module.name());

        let params: M::Params = args.parse()?;
        params.validate()?;

        let instance = args.instance()?.or(self.fallback.clone()).resolve()?;
        let client = Client::connect(&instance).await?;
        let ctx = ModuleContext::new(client, args.check_mode, args.diff);

        let output = self.module.run(&ctx, params).await?;
        tracing::info!(
            "Module {} finished (changed: {})",
            self.module.name(),
            output.changed
        );
        Ok(output)
    }

    /// Like [`execute`](Self::execute), but renders errors the way Ansible expects them.
    pub async fn run(&self, args: &ModuleArgs) -> ModuleOutput {
        match self.execute(args).await {
            Ok(output) => output,
            Err(e) => {
                tracing::error!(
                    "Module {} failed: {} (Category: {:?}, Severity: {:?})",
                    self.module.name(),
                    e,
                    e.category(),
                    e.severity()
                );
                ModuleOutput::failure(e.to_string())
            }
        }
    }
}

/// Environment variables, optionally overlaid by a profile file.
pub fn fallback_settings(profile: Option<&Path>) -> Result<InstanceSettings> {
    let env = InstanceSettings::from_env()?;
    match profile {
        Some(path) => Ok(InstanceProfile::from_file(path)?.instance.or(env)),
        None => Ok(env),
    }
}

pub fn print_output(output: &ModuleOutput) -> ExitCode {
    match serde_json::to_string(output) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            println!(
                "{{\"failed\": true, \"msg\": \"Could not serialize module result: {}\"}}",
                e.to_string().replace('"', "'")
            );
            return ExitCode::FAILURE;
        }
    }

    if output.is_failed() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Entry point shared by the Ansible binary modules: `<module> <args-file>`.
pub async fn run_binary_module<M: Module>(module: M) -> ExitCode {
    logger::init_module_logger();

    let output = match load_binary_args() {
        Ok((args, fallback)) => {
            ModuleEngine::new(module)
                .with_fallback(fallback)
                .run(&args)
                .await
        }
        Err(e) => ModuleOutput::failure(e.to_string()),
    };

    print_output(&output)
}

fn load_binary_args() -> Result<(ModuleArgs, InstanceSettings)> {
    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| SnowError::ArgumentError {
            message: "No module arguments file given".to_string(),
        })?;
    let profile = std::env::var_os("SN_PROFILE").map(PathBuf::from);
    load_inputs(Path::new(&path), profile.as_deref())
}

/// Reads the args file and the fallback instance settings for one invocation.
pub fn load_inputs(
    args_file: &Path,
    profile: Option<&Path>,
) -> Result<(ModuleArgs, InstanceSettings)> {
    let args = ModuleArgs::from_file(args_file)?;
    let fallback = fallback_settings(profile)?;
    Ok((args, fallback))
}
