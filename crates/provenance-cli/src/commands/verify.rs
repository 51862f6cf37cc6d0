//! Verify command implementation.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use provenance_common_core::FileId;
use provenance_ledger::VerificationReport;

use crate::cli::{CommandContext, Exit};
use crate::commands::upload::registered_name;
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput};

/// Re-verify a file against its ledger chain.
///
/// Exit status: 0 VALID, 20 TAMPERED_FILE, 21 TAMPERED_DB, 22 UNKNOWN.
#[derive(Debug, Parser)]
pub struct VerifyCommand {
    /// File to verify
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Registered name to look up (defaults to the file name)
    #[arg(long, conflicts_with = "file_id")]
    pub name: Option<String>,

    /// Verify against an explicit file id instead of a name
    #[arg(long)]
    pub file_id: Option<FileId>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct VerifyOutput(VerificationReport);

impl FormattedOutput for VerifyOutput {
    fn format_text(&self) -> String {
        let report = &self.0;
        let mut out = format!("{}: {}", report.outcome, report.reason);
        if let Some(id) = report.file_id {
            out.push_str(&format!("\n  file:     {id}"));
        }
        if let Some(expected) = &report.expected_hash {
            out.push_str(&format!("\n  expected: {expected}"));
        }
        out.push_str(&format!("\n  observed: {}", report.observed_hash));
        if let Some(record) = &report.appended {
            out.push_str(&format!("\n  recorded: {} ({})", record.id, record.action()));
        }
        out
    }
}

impl VerifyCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<Exit, CliError> {
        let metadata = tokio::fs::metadata(&self.path)
            .await
            .map_err(|e| CliError::io_with_path("Cannot read file", e, &self.path))?;
        if metadata.len() > ctx.config.uploads.max_bytes {
            return Err(CliError::validation(format!(
                "{} exceeds the {} byte upload limit",
                self.path.display(),
                ctx.config.uploads.max_bytes
            )));
        }

        let service = ctx.open_service().await?;
        let report = match self.file_id {
            Some(file_id) => service.verify_file_by_id(file_id, &self.path).await?,
            None => {
                let name = registered_name(&self.path, self.name.as_deref())?;
                service.verify_file(&name, &self.path).await?
            }
        };
        service.close().await;

        let exit = Exit::from(report.outcome);
        print_output(ctx, &VerifyOutput(report))?;
        Ok(exit)
    }
}
