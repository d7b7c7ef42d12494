use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about = "Infer and convert the types of untyped text", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Infer the most likely type of every column in a CSV file
    Infer(InferArgs),
    /// Convert values given on the command line and report their types
    Convert(ConvertArgs),
}

#[derive(Debug, Args)]
pub struct InferArgs {
    /// Input CSV file to inspect (`-` reads stdin)
    #[arg(short = 'i', long = "input")]
    pub input: PathBuf,
    /// Number of rows to examine (0 means full scan)
    #[arg(long, default_value_t = 0)]
    pub sample_rows: usize,
    /// Distinct examples kept per type (0 keeps all)
    #[arg(long, default_value_t = 10)]
    pub sample_cap: usize,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Treat the first row as data and name columns field_1, field_2, ...
    #[arg(long = "no-headers")]
    pub no_headers: bool,
    /// YAML file overriding the recognized date/time layouts
    #[arg(long)]
    pub formats: Option<PathBuf>,
    /// Emit the report as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Values to convert
    #[arg(required = true, allow_hyphen_values = true)]
    pub values: Vec<String>,
    /// YAML file overriding the recognized date/time layouts
    #[arg(long)]
    pub formats: Option<PathBuf>,
    /// Emit the conversions as JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\\t" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "pipe" | "|" => Ok(b'|'),
        "semicolon" | ";" => Ok(b';'),
        other => match other.as_bytes() {
            [] => Err("Delimiter cannot be empty".to_string()),
            [byte] if byte.is_ascii() => Ok(*byte),
            [_] => Err("Delimiter must be ASCII".to_string()),
            _ => Err("Delimiter must be a single character".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_delimiter_accepts_names_and_characters() {
        assert_eq!(parse_delimiter("tab"), Ok(b'\t'));
        assert_eq!(parse_delimiter("pipe"), Ok(b'|'));
        assert_eq!(parse_delimiter(":"), Ok(b':'));
        assert!(parse_delimiter("").is_err());
        assert!(parse_delimiter("ab").is_err());
        assert!(parse_delimiter("é").is_err());
    }

    #[test]
    fn infer_args_defaults() {
        let cli = Cli::parse_from(["strconv", "infer", "-i", "data.csv"]);
        match cli.command {
            Commands::Infer(args) => {
                assert_eq!(args.sample_rows, 0);
                assert_eq!(args.sample_cap, 10);
                assert!(!args.no_headers);
                assert!(args.delimiter.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
