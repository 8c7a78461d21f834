//! Command execution.
//!
//! Loads the config file, runs the selected command and turns failures into
//! an error message, recovery suggestions and exit code 1.

mod crossbuild;
mod helpers;
mod release;

use crate::cli::{Args, Command, RuntimeConfig};
use crate::config::FileConfig;
use crate::error::{CrossbuildError, Result};

use crossbuild::execute_crossbuild;
use release::execute_release;

/// Execute the main command based on parsed arguments
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        // Validation errors are never quiet
        let output = super::OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {}", validation_error));
        return Ok(1);
    }

    let config = RuntimeConfig::from(&args);

    let result = run_command(&args, &config).await;

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            report_failure(&config, args.command.name(), &e);
            Ok(1)
        }
    }
}

async fn run_command(args: &Args, config: &RuntimeConfig) -> Result<i32> {
    let cwd = helpers::working_directory()?;
    let file = FileConfig::load(args.config.as_deref(), &cwd)?;

    match &args.command {
        Command::Crossbuild(cmd) => execute_crossbuild(cmd, &file, &cwd, config).await,
        Command::Release(cmd) => execute_release(cmd, &file, &cwd, config).await,
    }
}

fn report_failure(config: &RuntimeConfig, command: &str, error: &CrossbuildError) {
    config.error_println(&format!("Command '{}' failed: {}", command, error));
    log::debug!("{:?}", error);

    let suggestions = error.recovery_suggestions();
    if !suggestions.is_empty() {
        config.println("\n💡 Recovery suggestions:");
        for suggestion in suggestions {
            config.indent(&format!("• {}", suggestion));
        }
    }
}
