//! CLI argument definitions using clap derive macros.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueHint};
use provenance_common_config::{ConfigLoader, LedgerConfig};
use provenance_ledger::{Outcome, ProvenanceService};

use crate::commands::{
    CheckCommand, HistoryCommand, InitCommand, RecentCommand, UploadCommand, VerifyCommand,
};
use crate::error::CliError;

/// Tamper-evident provenance ledger for uploaded files.
#[derive(Debug, Parser)]
#[command(
    name = "provenance",
    author,
    version,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Increase verbosity level (-v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Project directory holding provenance.yaml
    #[arg(
        short,
        long,
        global = true,
        env = "PROVENANCE_CONFIG",
        value_hint = ValueHint::DirPath
    )]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, default_value = "text", value_enum)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Provision the secret key, system identity and database
    Init(InitCommand),

    /// Store a file and record its CREATE entry
    Upload(UploadCommand),

    /// Re-verify a file against its ledger chain
    Verify(VerifyCommand),

    /// Show a file's provenance records and chain status
    History(HistoryCommand),

    /// List recently registered files
    Recent(RecentCommand),

    /// Check a file's chain without recording anything
    Check(CheckCommand),
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Exit {
    Success = 0,
    GeneralError = 1,
    ConfigError = 2,
    IoError = 3,
    ValidationError = 5,
    NotFound = 6,
    LedgerError = 7,
    TamperedFile = 20,
    TamperedDb = 21,
    Unknown = 22,
}

impl From<Exit> for ExitCode {
    fn from(exit: Exit) -> Self {
        ExitCode::from(exit as u8)
    }
}

impl From<Outcome> for Exit {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Valid => Exit::Success,
            Outcome::TamperedFile => Exit::TamperedFile,
            Outcome::TamperedDb => Exit::TamperedDb,
            Outcome::Unknown => Exit::Unknown,
        }
    }
}

impl Cli {
    pub fn project_dir(&self) -> &Path {
        self.config.as_deref().unwrap_or_else(|| Path::new("."))
    }

    /// Load configuration from the project directory.
    pub fn load_config(&self) -> Result<LedgerConfig, CliError> {
        Ok(ConfigLoader::new(self.project_dir()).load()?)
    }

    /// Execute the selected command
    pub async fn execute(self, config: LedgerConfig) -> Result<Exit, CliError> {
        let ctx = CommandContext {
            project_dir: self.project_dir().to_path_buf(),
            config,
            format: self.format,
        };

        match self.command {
            Command::Init(cmd) => cmd.execute(&ctx).await,
            Command::Upload(cmd) => cmd.execute(&ctx).await,
            Command::Verify(cmd) => cmd.execute(&ctx).await,
            Command::History(cmd) => cmd.execute(&ctx).await,
            Command::Recent(cmd) => cmd.execute(&ctx).await,
            Command::Check(cmd) => cmd.execute(&ctx).await,
        }
    }
}

/// Context passed to all commands
#[derive(Debug)]
pub struct CommandContext {
    pub project_dir: PathBuf,
    pub config: LedgerConfig,
    pub format: OutputFormat,
}

impl CommandContext {
    pub async fn open_service(&self) -> Result<ProvenanceService, CliError> {
        Ok(ProvenanceService::open(&self.config).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["provenance", "recent", "--format", "json", "-vv"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Command::Recent(_)));
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["provenance", "-q", "-v", "init"]).is_err());
    }

    #[test]
    fn test_outcome_exit_codes() {
        assert_eq!(Exit::from(Outcome::Valid) as u8, 0);
        assert_eq!(Exit::from(Outcome::TamperedFile) as u8, 20);
        assert_eq!(Exit::from(Outcome::TamperedDb) as u8, 21);
        assert_eq!(Exit::from(Outcome::Unknown) as u8, 22);
    }
}
