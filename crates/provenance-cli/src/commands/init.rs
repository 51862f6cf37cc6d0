//! Init command implementation.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use provenance_common_config::{ConfigLoader, LedgerConfig};

use crate::cli::{CommandContext, Exit};
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput};

/// Provision the data directory. Safe to run repeatedly: existing keys and
/// records are kept.
#[derive(Debug, Parser)]
pub struct InitCommand {
    /// Also write a default provenance.yaml if the project has none
    #[arg(long)]
    pub write_config: bool,
}

#[derive(Debug, Serialize)]
struct InitOutput {
    data_dir: PathBuf,
    database: PathBuf,
    system_id: String,
    key_fingerprint: String,
    config_written: Option<PathBuf>,
}

impl FormattedOutput for InitOutput {
    fn format_text(&self) -> String {
        let mut out = format!(
            "Ledger ready in {}\n  database:  {}\n  system id: {}\n  key:       {}",
            self.data_dir.display(),
            self.database.display(),
            self.system_id,
            self.key_fingerprint
        );
        if let Some(path) = &self.config_written {
            out.push_str(&format!("\n  wrote {}", path.display()));
        }
        out
    }
}

impl InitCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<Exit, CliError> {
        let loader = ConfigLoader::new(&ctx.project_dir);
        let config_written = if self.write_config && !loader.config_path().exists() {
            loader.save(&LedgerConfig::default())?;
            Some(loader.config_path())
        } else {
            None
        };

        let service = ctx.open_service().await?;
        let ledger = service.ledger();
        let output = InitOutput {
            data_dir: ctx.config.data_dir.clone(),
            database: ctx.config.database_path(),
            system_id: ledger.identity().to_string(),
            key_fingerprint: ledger.signer().key_fingerprint().to_string(),
            config_written,
        };
        service.close().await;

        print_output(ctx, &output)?;
        Ok(Exit::Success)
    }
}
