//! Check command implementation.

use clap::Parser;
use serde::Serialize;

use provenance_common_core::FileId;
use provenance_ledger::ChainStatus;

use crate::cli::{CommandContext, Exit};
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput};

/// Walk a file's chain without appending a record. Exits 21 when the chain
/// fails.
#[derive(Debug, Parser)]
pub struct CheckCommand {
    pub file_id: FileId,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct CheckOutput(ChainStatus);

impl FormattedOutput for CheckOutput {
    fn format_text(&self) -> String {
        match &self.0.violation {
            None => format!(
                "File {}: chain intact ({} records)",
                self.0.file_id, self.0.length
            ),
            Some(violation) => format!("File {}: chain BROKEN: {violation}", self.0.file_id),
        }
    }
}

impl CheckCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<Exit, CliError> {
        let service = ctx.open_service().await?;
        let status = service.check_chain(self.file_id).await?;
        service.close().await;

        let exit = if status.is_intact() {
            Exit::Success
        } else {
            Exit::TamperedDb
        };
        print_output(ctx, &CheckOutput(status))?;
        Ok(exit)
    }
}
