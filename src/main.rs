//! dojo - Import external skill and agent definitions into a catalog
//!
//! Exit codes: 0 success, 1 negative verdict (conflict, invalid entry,
//! missing dependencies), 2 fatal error.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use dojo_import::Result;
use dojo_import::app::AppContext;
use dojo_import::cli::Cli;
use dojo_import::cli::commands::{self, Verdict};
use dojo_import::cli::output::{self, OutputFormat};

fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = cli.output_format();
    if format == OutputFormat::Plain {
        console::set_colors_enabled(false);
        colored::control::set_override(false);
    }
    init_tracing(&cli, format);

    match run(&cli) {
        Ok(Verdict::Pass) => ExitCode::SUCCESS,
        Ok(Verdict::Fail) => ExitCode::from(1),
        Err(e) => {
            if format.is_machine_readable() {
                // Machine mode: structured error envelope on stdout
                if let Err(emit_err) = output::emit_robot(&output::robot_error_structured(&e), format) {
                    eprintln!("Error: {e} ({emit_err})");
                }
            } else {
                eprintln!("Error: {e}");
                eprintln!("Hint: {}", e.to_structured().suggestion);
            }
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<Verdict> {
    let ctx = AppContext::from_cli(cli)?;
    commands::run(&ctx, &cli.command)
}

fn init_tracing(cli: &Cli, format: OutputFormat) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,dojo_import=info",
        1 => "info,dojo_import=debug",
        2 => "debug,dojo_import=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    if format.is_machine_readable() {
        // JSON logging for machine mode
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_ansi(format.use_colors())
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
