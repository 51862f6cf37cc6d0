//! History command implementation.

use clap::Parser;
use serde::Serialize;

use provenance_common_core::FileId;
use provenance_ledger::HistoryView;

use crate::cli::{CommandContext, Exit};
use crate::error::CliError;
use crate::output::{print_output, short_hash, FormattedOutput};

/// Show a file's provenance records
#[derive(Debug, Parser)]
pub struct HistoryCommand {
    /// File id (`7` or `file_7`)
    pub file_id: FileId,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
struct HistoryOutput(HistoryView);

impl FormattedOutput for HistoryOutput {
    fn format_text(&self) -> String {
        let view = &self.0;
        let mut out = format!(
            "File {} '{}' uploaded {} by {}\n",
            view.file.id, view.file.filename, view.file.upload_time, view.file.system_id
        );
        out.push_str(&format!(
            "{:>6}  {:<7}  {:<27}  {:<12}  {:<12}  {:<12}\n",
            "ID", "ACTION", "TIMESTAMP", "FILE HASH", "PREV", "CURR"
        ));
        for row in &view.records {
            out.push_str(&format!(
                "{:>6}  {:<7}  {:<27}  {:<12}  {:<12}  {:<12}\n",
                row.id,
                row.action,
                row.timestamp,
                short_hash(&row.file_hash),
                short_hash(&row.prev_hash),
                short_hash(&row.curr_hash)
            ));
        }
        match &view.chain.violation {
            None => out.push_str(&format!("Chain intact ({} records)", view.chain.length)),
            Some(violation) => out.push_str(&format!("Chain BROKEN: {violation}")),
        }
        out
    }
}

impl HistoryCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<Exit, CliError> {
        let service = ctx.open_service().await?;
        let view = service.history_with_status(self.file_id).await?;
        service.close().await;

        print_output(ctx, &HistoryOutput(view))?;
        Ok(Exit::Success)
    }
}
