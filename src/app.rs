//! Per-invocation state shared by every command.

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;
use crate::error::Result;

pub struct AppContext {
    pub config: Config,
    pub output_format: OutputFormat,
    /// JSON envelope output instead of human text.
    pub robot_mode: bool,
    pub quiet: bool,
}

impl AppContext {
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let config = Config::load(cli.config.as_deref(), &cwd)?;
        let output_format = cli.output_format();
        Ok(Self {
            config,
            output_format,
            robot_mode: output_format.is_machine_readable(),
            quiet: cli.quiet,
        })
    }

    /// Context without reading any config files.
    #[must_use]
    pub fn with_config(config: Config, output_format: OutputFormat) -> Self {
        Self {
            config,
            output_format,
            robot_mode: output_format.is_machine_readable(),
            quiet: false,
        }
    }
}
