//! Recent command implementation.

use clap::Parser;
use serde::Serialize;

use provenance_ledger::FileRecord;

use crate::cli::{CommandContext, Exit};
use crate::error::CliError;
use crate::output::{print_output, short_hash, FormattedOutput};

/// List the most recently registered files
#[derive(Debug, Parser)]
pub struct RecentCommand {
    /// Maximum number of files to list
    #[arg(short, long, default_value_t = 10)]
    pub limit: u32,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct RecentOutput(Vec<FileRecord>);

impl FormattedOutput for RecentOutput {
    fn format_text(&self) -> String {
        if self.0.is_empty() {
            return "No files registered".to_string();
        }
        self.0
            .iter()
            .map(|f| {
                format!(
                    "{:>6}  {}  {}  {}",
                    f.id,
                    f.upload_time,
                    short_hash(&f.original_hash),
                    f.filename
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl RecentCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<Exit, CliError> {
        let service = ctx.open_service().await?;
        let files = service.recent_files(self.limit).await?;
        service.close().await;

        print_output(ctx, &RecentOutput(files))?;
        Ok(Exit::Success)
    }
}
