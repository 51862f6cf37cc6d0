//! Main entry point for the `provenance` binary.

use std::process::ExitCode;

use clap::Parser;
use provenance_cli::{Cli, CliError, Exit};
use provenance_common_config::{Environment, LedgerConfig};
use provenance_common_log::LogLevel;
use tracing::error;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = Environment::init() {
        eprintln!("warning: {e}");
    }

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => return report(&e),
    };
    if let Err(e) = init_logging(&cli, &config) {
        return report(&e);
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => return report(&CliError::from(e)),
    };

    match runtime.block_on(cli.execute(config)) {
        Ok(exit) => exit.into(),
        Err(e) => {
            error!(code = e.code(), "{e}");
            report(&e)
        }
    }
}

fn init_logging(cli: &Cli, config: &LedgerConfig) -> Result<(), CliError> {
    let mut log = config.log.clone();
    log.level = LogLevel::from_verbosity(log.level, cli.verbose, cli.quiet);
    provenance_common_log::init(log)?;
    Ok(())
}

fn report(err: &CliError) -> ExitCode {
    eprintln!("error[{}]: {err}", err.code());
    if let Some(hint) = err.hint() {
        eprintln!("  hint: {hint}");
    }
    let exit: Exit = err.exit();
    exit.into()
}
