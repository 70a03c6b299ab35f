//! Entry point for the `blockreg` binary.
//!
//! Parses arguments, builds and materializes the requested dataset, and
//! prints a layout summary to stdout. Logging goes to stderr and is
//! installed before anything else runs.

use std::io::{self, BufWriter, Write};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use blockreg_cli::{
    cli::{Cli, CliError, render_summary, run_cli},
    logging::{self, LoggingError},
};
use tracing::{error, field};

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let summary = run_cli(cli).context("failed to execute command")?;
    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    render_summary(&summary, &mut writer).context("failed to render summary")?;
    writer.flush().context("failed to flush output")?;
    Ok(())
}

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging() {
        report_logging_init_error(&err);
        return ExitCode::FAILURE;
    }

    if let Err(err) = try_main() {
        let core = err.downcast_ref::<CliError>().map(|CliError::Core(core)| core);
        let code_field = core.map(|core| field::display(core.code().as_str()));
        let detail_field = core.and_then(|core| {
            core.partition_code()
                .map(|code| code.as_str())
                .or_else(|| core.execution_code().map(|code| code.as_str()))
                .map(field::display)
        });

        error!(
            error = %err,
            code = code_field,
            detail_code = detail_field,
            "command execution failed"
        );
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

#[expect(
    clippy::print_stderr,
    reason = "Emit one-off diagnostic before tracing is initialized"
)]
fn report_logging_init_error(err: &LoggingError) {
    eprintln!("failed to initialize logging: {err}");
}
