//! String type inference and conversion.
//!
//! [`ConverterRegistry`] turns raw text into typed [`Value`]s by trying an
//! ordered list of named converters, and profiles sequences or row-major
//! tables of text into per-column [`TypeProfile`]s. The functions at the crate
//! root use a shared registry holding the built-in converters:
//!
//! ```
//! use strconv::{InferOptions, Value};
//!
//! assert_eq!(strconv::convert(Some("-3")), Value::Integer(-3));
//! assert_eq!(strconv::infer(Some("+0.4")), Some("float"));
//!
//! let profile = strconv::infer_series(["+0.4", "1.0", "0.", "None"], InferOptions::default())
//!     .expect("non-empty input");
//! assert_eq!(profile.inferred_type().unwrap(), ("float", 3));
//! ```

pub mod cli;
pub mod converters;
pub mod error;
pub mod infer;
pub mod io_utils;
mod lenient;
pub mod probe;
pub mod profile;
pub mod registry;
pub mod table;
pub mod value;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::{LevelFilter, debug};
use serde::Serialize;

pub use crate::{
    converters::DateTimeFormats,
    error::Error,
    infer::InferOptions,
    profile::{InferredType, TypeProfile, TypeSample},
    registry::{Converter, ConverterRegistry, RawField},
    value::{Value, ValueKind},
};

use crate::cli::{Cli, Commands, ConvertArgs};

static LOGGER: OnceLock<()> = OnceLock::new();
static DEFAULT_REGISTRY: OnceLock<ConverterRegistry> = OnceLock::new();

/// The shared registry with the built-in converters in their default order.
///
/// To add, remove or reorder converters, start from
/// [`ConverterRegistry::builtin`] instead.
pub fn default_registry() -> &'static ConverterRegistry {
    DEFAULT_REGISTRY.get_or_init(|| {
        debug!("Initializing default converter registry");
        ConverterRegistry::builtin()
    })
}

pub fn convert(text: Option<&str>) -> Value {
    default_registry().convert(text)
}

pub fn convert_with_type(text: Option<&str>) -> (Value, Option<&'static str>) {
    default_registry().convert_with_type(text)
}

pub fn infer(text: Option<&str>) -> Option<&'static str> {
    default_registry().infer(text)
}

pub fn infer_kind(text: Option<&str>) -> Option<ValueKind> {
    default_registry().infer_kind(text)
}

pub fn infer_series<I>(values: I, options: InferOptions) -> Option<TypeProfile>
where
    I: IntoIterator,
    I::Item: RawField,
{
    default_registry().infer_series(values, options)
}

pub fn infer_matrix<R>(rows: R, options: InferOptions) -> Vec<TypeProfile>
where
    R: IntoIterator,
    R::Item: IntoIterator,
    <R::Item as IntoIterator>::Item: RawField,
{
    default_registry().infer_matrix(rows, options)
}

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("strconv", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Infer(args) => probe::execute(&args),
        Commands::Convert(args) => handle_convert(&args),
    }
}

#[derive(Debug, Serialize)]
struct Conversion<'a> {
    input: &'a str,
    #[serde(rename = "type")]
    type_name: Option<&'a str>,
    kind: ValueKind,
    value: Value,
}

fn handle_convert(args: &ConvertArgs) -> Result<()> {
    let registry = probe::load_registry(args.formats.as_deref())?;
    debug!("Converting {} value(s)", args.values.len());
    let conversions = args
        .values
        .iter()
        .zip(registry.convert_series_with_type(&args.values))
        .map(|(input, (value, type_name))| Conversion {
            input,
            type_name,
            kind: value.kind(),
            value,
        })
        .collect::<Vec<_>>();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&conversions)?);
        return Ok(());
    }

    let headers = ["input", "type", "kind", "value"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = conversions
        .iter()
        .map(|conversion| {
            vec![
                conversion.input.to_string(),
                conversion.type_name.unwrap_or("-").to_string(),
                conversion.kind.to_string(),
                conversion.value.as_display(),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b'\t' => "\\t".to_string(),
        other => (other as char).to_string(),
    }
}
