use std::path::Path;

use anyhow::{Context, Result};
use encoding_rs::Encoding;
use log::info;
use serde::Serialize;

use crate::{
    cli::InferArgs,
    converters::DateTimeFormats,
    infer::InferOptions,
    io_utils,
    profile::TypeProfile,
    registry::ConverterRegistry,
    table,
};

#[derive(Debug, Clone, Serialize)]
pub struct TypeShare {
    pub name: String,
    pub count: usize,
    pub frequency: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ColumnReport {
    pub name: String,
    pub inferred_type: String,
    pub count: usize,
    pub rows: usize,
    pub types: Vec<TypeShare>,
    pub examples: Vec<String>,
}

impl ColumnReport {
    pub fn from_profile(name: &str, profile: &TypeProfile) -> Self {
        let inferred = profile.inferred_type();
        let inferred_name = inferred.as_ref().map(|t| t.name.clone()).unwrap_or_default();
        let examples = profile
            .get(&inferred_name)
            .map(|sample| {
                sample
                    .sample()
                    .iter()
                    .map(|(_, value)| value.clone().unwrap_or_default())
                    .collect()
            })
            .unwrap_or_default();
        let types = profile
            .ranked(None)
            .into_iter()
            .map(|(type_name, count)| TypeShare {
                name: type_name.to_string(),
                count,
                frequency: profile
                    .get(type_name)
                    .map_or(0.0, |sample| sample.frequency()),
            })
            .collect();
        Self {
            name: name.to_string(),
            inferred_type: inferred_name,
            count: inferred.map_or(0, |t| t.count),
            rows: profile.total().unwrap_or_default(),
            types,
            examples,
        }
    }
}

/// Builds the registry used by the commands: the built-ins, with date/time
/// layouts from `formats` when given.
pub fn load_registry(formats: Option<&Path>) -> Result<ConverterRegistry> {
    match formats {
        Some(path) => {
            let formats = DateTimeFormats::load(path)?;
            info!(
                "Using {} date and {} time layout(s) from {path:?}",
                formats.date_formats.len(),
                formats.time_formats.len()
            );
            Ok(ConverterRegistry::with_formats(&formats))
        }
        None => Ok(ConverterRegistry::builtin()),
    }
}

/// Streams the CSV at `path` through matrix inference.
pub fn profile_csv(
    path: &Path,
    registry: &ConverterRegistry,
    delimiter: u8,
    encoding: &'static Encoding,
    has_headers: bool,
    options: InferOptions,
) -> Result<Vec<ColumnReport>> {
    let mut reader = io_utils::open_csv_reader(path, delimiter, has_headers)?;
    let headers = if has_headers {
        let record = reader
            .byte_headers()
            .with_context(|| format!("Reading headers from {path:?}"))?
            .clone();
        io_utils::decode_record(&record, encoding).context("Decoding headers")?
    } else {
        Vec::new()
    };

    let mut failure = None;
    let rows = reader
        .byte_records()
        .enumerate()
        .map_while(|(idx, record)| {
            let line = idx + if has_headers { 2 } else { 1 };
            let decoded = record
                .map_err(anyhow::Error::from)
                .and_then(|record| io_utils::decode_record(&record, encoding));
            match decoded {
                Ok(row) => Some(row),
                Err(err) => {
                    failure = Some(err.context(format!("Reading row {line}")));
                    None
                }
            }
        });
    let profiles = registry.infer_matrix(rows, options);
    if let Some(err) = failure {
        return Err(err);
    }

    Ok(profiles
        .iter()
        .enumerate()
        .map(|(idx, profile)| {
            let name = headers
                .get(idx)
                .cloned()
                .unwrap_or_else(|| format!("field_{}", idx + 1));
            ColumnReport::from_profile(&name, profile)
        })
        .collect())
}

pub fn execute(args: &InferArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let registry = load_registry(args.formats.as_deref())?;
    let options = InferOptions {
        limit: (args.sample_rows > 0).then_some(args.sample_rows),
        sample_cap: (args.sample_cap > 0).then_some(args.sample_cap),
    };

    info!(
        "Inferring column types of '{}' with delimiter '{}'",
        args.input.display(),
        crate::printable_delimiter(delimiter)
    );
    let reports = profile_csv(
        &args.input,
        &registry,
        delimiter,
        encoding,
        !args.no_headers,
        options,
    )
    .with_context(|| format!("Inferring column types from {:?}", args.input))?;
    info!("Inferred {} column(s)", reports.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
        return Ok(());
    }

    let headers = ["column", "type", "count", "rows", "breakdown", "examples"]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>();
    let rows = reports
        .iter()
        .map(|report| {
            let breakdown = report
                .types
                .iter()
                .map(|share| format!("{}={:.2}", share.name, share.frequency))
                .collect::<Vec<_>>()
                .join(" ");
            vec![
                report.name.clone(),
                report.inferred_type.clone(),
                report.count.to_string(),
                report.rows.to_string(),
                breakdown,
                report.examples.join(", "),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&headers, &rows);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn profile_csv_names_columns_from_headers() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "id,price,active").unwrap();
        writeln!(file, "1,1,yes").unwrap();
        writeln!(file, "2,2.5,no").unwrap();
        writeln!(file, "3,,t").unwrap();

        let registry = ConverterRegistry::builtin();
        let reports = profile_csv(
            file.path(),
            &registry,
            b',',
            UTF_8,
            true,
            InferOptions::default(),
        )
        .expect("profile csv");

        assert_eq!(reports.len(), 3);
        assert_eq!(reports[0].name, "id");
        assert_eq!(reports[0].inferred_type, "int");
        assert_eq!(reports[1].inferred_type, "float");
        assert_eq!(reports[1].count, 1);
        assert_eq!(reports[1].examples, vec!["2.5".to_string()]);
        assert_eq!(reports[2].inferred_type, "bool");
        assert_eq!(reports[2].rows, 3);
    }

    #[test]
    fn profile_csv_synthesizes_names_without_headers() {
        let mut file = NamedTempFile::new().expect("temp file");
        writeln!(file, "2013-03-01,x").unwrap();
        writeln!(file, "2013-03-02,y").unwrap();

        let registry = ConverterRegistry::builtin();
        let reports = profile_csv(
            file.path(),
            &registry,
            b',',
            UTF_8,
            false,
            InferOptions::default().with_limit(1),
        )
        .expect("profile csv");

        assert_eq!(reports[0].name, "field_1");
        assert_eq!(reports[0].inferred_type, "date");
        assert_eq!(reports[0].rows, 1);
        assert_eq!(reports[1].inferred_type, "string");
    }

    #[test]
    fn profile_csv_reports_undecodable_rows() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"a\n1\n\xff\n").unwrap();

        let registry = ConverterRegistry::builtin();
        let err = profile_csv(
            file.path(),
            &registry,
            b',',
            UTF_8,
            true,
            InferOptions::default(),
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("Reading row 3"));
    }
}
