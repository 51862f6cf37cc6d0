//! Upload command implementation.

use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;

use provenance_ledger::{FileRecord, ProvenanceRecord};

use crate::cli::{CommandContext, Exit};
use crate::error::CliError;
use crate::output::{print_output, FormattedOutput};
use crate::storage::{sanitize_filename, store_upload};

/// Store a file in the uploads directory and register it
#[derive(Debug, Parser)]
pub struct UploadCommand {
    /// File to upload
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub path: PathBuf,

    /// Name to register the file under (defaults to its file name)
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
struct UploadOutput {
    file: FileRecord,
    record: ProvenanceRecord,
}

impl FormattedOutput for UploadOutput {
    fn format_text(&self) -> String {
        format!(
            "Registered '{}' as file {}\n  stored: {}\n  sha256: {}\n  record: {} ({})",
            self.file.filename,
            self.file.id,
            self.file.stored_path,
            self.file.original_hash,
            self.record.id,
            self.record.action()
        )
    }
}

/// Name to register `path` under, cleaned the same way as the stored copy so
/// upload and verify agree on it.
pub(crate) fn registered_name(path: &std::path::Path, name: Option<&str>) -> Result<String, CliError> {
    let raw = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CliError::validation(format!("{} has no file name", path.display())))?,
    };
    sanitize_filename(&raw)
        .ok_or_else(|| CliError::validation(format!("'{raw}' is not a usable file name")))
}

impl UploadCommand {
    pub async fn execute(&self, ctx: &CommandContext) -> Result<Exit, CliError> {
        let name = registered_name(&self.path, self.name.as_deref())?;
        let service = ctx.open_service().await?;

        let stored = store_upload(&ctx.config, &self.path, &name).await?;
        let (file, record) = service.register_upload(&name, &stored).await?;
        service.close().await;

        print_output(ctx, &UploadOutput { file, record })?;
        Ok(Exit::Success)
    }
}
