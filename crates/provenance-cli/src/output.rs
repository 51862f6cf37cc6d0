//! Output formatting utilities for CLI commands.

use serde::Serialize;
use std::io::Write;

use crate::cli::{CommandContext, OutputFormat};
use crate::error::CliError;

/// Trait for types that can be formatted for output
pub trait FormattedOutput: Serialize {
    fn format_text(&self) -> String;

    fn format_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Print formatted output to stdout
pub fn print_output<T: FormattedOutput>(ctx: &CommandContext, value: &T) -> Result<(), CliError> {
    write_output(ctx, value, std::io::stdout().lock())
}

/// Print formatted output to a writer
pub fn write_output<T, W>(ctx: &CommandContext, value: &T, mut writer: W) -> Result<(), CliError>
where
    T: FormattedOutput,
    W: Write,
{
    let output = match ctx.format {
        OutputFormat::Text => value.format_text(),
        OutputFormat::Json => value.format_json()?,
    };
    writeln!(writer, "{output}")?;
    Ok(())
}

/// Shorten a hex digest for tables.
pub fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenance_common_config::LedgerConfig;

    #[derive(Serialize)]
    struct Greeting {
        message: String,
    }

    impl FormattedOutput for Greeting {
        fn format_text(&self) -> String {
            format!("> {}", self.message)
        }
    }

    fn ctx(format: OutputFormat) -> CommandContext {
        CommandContext {
            project_dir: ".".into(),
            config: LedgerConfig::default(),
            format,
        }
    }

    #[test]
    fn test_text_and_json() {
        let value = Greeting {
            message: "hi".into(),
        };
        let mut text = Vec::new();
        write_output(&ctx(OutputFormat::Text), &value, &mut text).unwrap();
        assert_eq!(String::from_utf8(text).unwrap(), "> hi\n");

        let mut json = Vec::new();
        write_output(&ctx(OutputFormat::Json), &value, &mut json).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(parsed["message"], "hi");
    }

    #[test]
    fn test_short_hash() {
        assert_eq!(short_hash(&"ab".repeat(32)), "abababababab");
        assert_eq!(short_hash("GENESIS"), "GENESIS");
    }
}
