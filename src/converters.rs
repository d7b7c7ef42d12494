use std::{fs::File, io::BufReader, path::Path, sync::LazyLock};

use anyhow::{Context, Result, ensure};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{lenient, value::Value};

pub const CORE_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%d-%m-%Y", "%d-%m-%y", "%d.%m.%Y", "%Y/%m/%d", "%d/%m/%Y",
];

pub const NAMED_MONTH_DATE_FORMATS: &[&str] = &[
    "%d %B, %Y",
    "%d %B, %y",
    "%d %b, %Y",
    "%d %b, %y",
    "%B %d, %Y",
    "%b %d, %Y",
];

// Offset-bearing layouts use a 24-hour clock: chrono cannot resolve `%I`
// without an AM/PM marker.
pub const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S%.f",
    "%H:%M",
    "%I:%M:%S %p",
    "%H:%M:%S%.f %z",
    "%I:%M %p",
    "%H:%M %z",
];

pub const DATE_TIME_SEPARATORS: &[&str] = &[" ", "T"];

static TRUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(t(rue)?|yes)$").expect("valid true pattern"));
static FALSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(f(alse)?|no)$").expect("valid false pattern"));

/// Layouts recognized by the temporal converters.
///
/// Loaded from YAML with [`DateTimeFormats::load`]; any key left out keeps
/// its default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DateTimeFormats {
    pub date_formats: Vec<String>,
    pub time_formats: Vec<String>,
    pub separators: Vec<String>,
    /// Enables the permissive month-first date parser.
    pub lenient: bool,
}

impl Default for DateTimeFormats {
    fn default() -> Self {
        Self {
            date_formats: CORE_DATE_FORMATS
                .iter()
                .chain(NAMED_MONTH_DATE_FORMATS)
                .map(|f| f.to_string())
                .collect(),
            time_formats: TIME_FORMATS.iter().map(|f| f.to_string()).collect(),
            separators: DATE_TIME_SEPARATORS.iter().map(|s| s.to_string()).collect(),
            lenient: true,
        }
    }
}

impl DateTimeFormats {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Opening formats file {path:?}"))?;
        let formats: DateTimeFormats = serde_yaml::from_reader(BufReader::new(file))
            .with_context(|| format!("Parsing formats file {path:?}"))?;
        formats.ensure_valid()?;
        Ok(formats)
    }

    pub fn ensure_valid(&self) -> Result<()> {
        ensure!(
            !self.date_formats.is_empty() || self.lenient,
            "At least one date format is required when lenient parsing is disabled"
        );
        ensure!(
            !self.time_formats.is_empty(),
            "At least one time format is required"
        );
        ensure!(
            !self.separators.is_empty(),
            "At least one date/time separator is required"
        );
        Ok(())
    }

    /// Every `date + separator + time` layout, date-major.
    pub fn datetime_layouts(&self) -> Vec<String> {
        let mut layouts =
            Vec::with_capacity(self.date_formats.len() * self.time_formats.len() * 2);
        for date in &self.date_formats {
            for time in &self.time_formats {
                for sep in &self.separators {
                    layouts.push(format!("{date}{sep}{time}"));
                }
            }
        }
        layouts
    }
}

pub fn convert_none(text: &str) -> Option<Value> {
    match text {
        "" | "None" => Some(Value::Null),
        _ => None,
    }
}

pub fn convert_int(text: &str) -> Option<Value> {
    text.trim_ascii().parse::<i64>().ok().map(Value::Integer)
}

pub fn convert_float(text: &str) -> Option<Value> {
    text.trim_ascii().parse::<f64>().ok().map(Value::Float)
}

pub fn convert_bool(text: &str) -> Option<Value> {
    if TRUE_RE.is_match(text) {
        Some(Value::Boolean(true))
    } else if FALSE_RE.is_match(text) {
        Some(Value::Boolean(false))
    } else {
        None
    }
}

#[derive(Debug, Clone)]
pub struct TimeConverter {
    formats: Vec<String>,
}

impl TimeConverter {
    pub fn new(formats: &DateTimeFormats) -> Self {
        Self {
            formats: formats.time_formats.clone(),
        }
    }

    pub fn parse(&self, text: &str) -> Option<Value> {
        self.formats
            .iter()
            .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
            .map(Value::Time)
    }
}

#[derive(Debug, Clone)]
pub struct DateTimeConverter {
    layouts: Vec<String>,
    lenient: bool,
}

impl DateTimeConverter {
    pub fn new(formats: &DateTimeFormats) -> Self {
        Self {
            layouts: formats.datetime_layouts(),
            lenient: formats.lenient,
        }
    }

    pub fn parse(&self, text: &str) -> Option<Value> {
        self.layouts
            .iter()
            .find_map(|layout| parse_datetime_layout(text, layout))
            .or_else(|| {
                if self.lenient {
                    lenient::parse_datetime(text)
                } else {
                    None
                }
            })
    }
}

fn parse_datetime_layout(text: &str, layout: &str) -> Option<Value> {
    if layout.contains("%z") {
        DateTime::parse_from_str(text, layout)
            .ok()
            .map(Value::DateTimeTz)
    } else {
        NaiveDateTime::parse_from_str(text, layout)
            .ok()
            .map(Value::DateTime)
    }
}

#[derive(Debug, Clone)]
pub struct DateConverter {
    formats: Vec<String>,
    lenient: bool,
}

impl DateConverter {
    pub fn new(formats: &DateTimeFormats) -> Self {
        Self {
            formats: formats.date_formats.clone(),
            lenient: formats.lenient,
        }
    }

    pub fn parse(&self, text: &str) -> Option<Value> {
        let lenient = if self.lenient {
            lenient::parse_date(text)
        } else {
            None
        };
        lenient
            .or_else(|| {
                self.formats
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
            })
            .map(Value::Date)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32, s: u32) -> Value {
        Value::Time(NaiveTime::from_hms_opt(h, m, s).unwrap())
    }

    #[test]
    fn none_accepts_blank_and_literal_token() {
        assert_eq!(convert_none(""), Some(Value::Null));
        assert_eq!(convert_none("None"), Some(Value::Null));
        assert_eq!(convert_none("none"), None);
        assert_eq!(convert_none("null"), None);
    }

    #[test]
    fn int_accepts_signed_digits() {
        assert_eq!(convert_int("0"), Some(Value::Integer(0)));
        assert_eq!(convert_int("+1"), Some(Value::Integer(1)));
        assert_eq!(convert_int("-1"), Some(Value::Integer(-1)));
        assert_eq!(convert_int(" 42 "), Some(Value::Integer(42)));
        assert_eq!(convert_int("1.0"), None);
        assert_eq!(convert_int("99999999999999999999"), None);
    }

    #[test]
    fn float_accepts_partial_decimals() {
        assert_eq!(convert_float("0."), Some(Value::Float(0.0)));
        assert_eq!(convert_float("+.0"), Some(Value::Float(0.0)));
        assert_eq!(convert_float("-1."), Some(Value::Float(-1.0)));
        assert_eq!(convert_float("1e3"), Some(Value::Float(1000.0)));
        assert_eq!(convert_float("."), None);
        assert_eq!(convert_float("abc"), None);
    }

    #[test]
    fn bool_is_case_insensitive() {
        for text in ["t", "TRUE", "Yes"] {
            assert_eq!(convert_bool(text), Some(Value::Boolean(true)), "{text}");
        }
        for text in ["f", "False", "NO"] {
            assert_eq!(convert_bool(text), Some(Value::Boolean(false)), "{text}");
        }
        assert_eq!(convert_bool("1"), None);
        assert_eq!(convert_bool("tru"), None);
    }

    #[test]
    fn time_layouts() {
        let converter = TimeConverter::new(&DateTimeFormats::default());
        assert_eq!(converter.parse("01:30"), Some(time(1, 30, 0)));
        assert_eq!(converter.parse("1:30"), Some(time(1, 30, 0)));
        assert_eq!(converter.parse("1:30:40"), Some(time(1, 30, 40)));
        assert_eq!(converter.parse("1:30:40 pm"), Some(time(13, 30, 40)));
        assert_eq!(converter.parse("15:30:40"), Some(time(15, 30, 40)));
        assert_eq!(converter.parse("5:30:40 AM"), Some(time(5, 30, 40)));
        assert_eq!(converter.parse("5:40 PM"), Some(time(17, 40, 0)));
        assert_eq!(converter.parse("25:00"), None);
    }

    #[test]
    fn datetime_cross_product_and_offsets() {
        let converter = DateTimeConverter::new(&DateTimeFormats::default());
        let expected = NaiveDate::from_ymd_opt(2013, 3, 1)
            .unwrap()
            .and_hms_opt(5, 30, 40)
            .unwrap();
        assert_eq!(
            converter.parse("Mar 1, 2013T5:30:40 AM"),
            Some(Value::DateTime(expected))
        );
        assert_eq!(
            converter.parse("Mar 1, 2013 5:30:40 AM"),
            Some(Value::DateTime(expected))
        );
        match converter.parse("2013-03-01 5:30:40 -0500") {
            Some(Value::DateTimeTz(dt)) => {
                assert_eq!(dt.naive_local(), expected);
                assert_eq!(dt.offset().local_minus_utc(), -18_000);
            }
            other => panic!("expected offset-aware datetime, got {other:?}"),
        }
        assert_eq!(converter.parse("foo"), None);
        assert_eq!(converter.parse("2013-03-01"), None);
    }

    #[test]
    fn datetime_midnight() {
        let converter = DateTimeConverter::new(&DateTimeFormats::default());
        let midnight = |y, m, d| {
            Value::DateTime(
                NaiveDate::from_ymd_opt(y, m, d)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            )
        };
        assert_eq!(
            converter.parse("2013-03-01 00:00:00"),
            Some(midnight(2013, 3, 1))
        );
        assert_eq!(
            converter.parse("2018/03/01 00:00:00"),
            Some(midnight(2018, 3, 1))
        );
        assert_eq!(
            converter.parse("March 4, 2013 12:00 AM"),
            Some(midnight(2013, 3, 4))
        );
    }

    #[test]
    fn strict_date_layouts_without_lenient_parser() {
        let formats = DateTimeFormats {
            lenient: false,
            ..DateTimeFormats::default()
        };
        let converter = DateConverter::new(&formats);
        let expected = Value::Date(NaiveDate::from_ymd_opt(2013, 3, 1).unwrap());
        assert_eq!(converter.parse("2013-03-01"), Some(expected.clone()));
        assert_eq!(converter.parse("01.03.2013"), Some(expected.clone()));
        assert_eq!(converter.parse("1 March, 2013"), Some(expected.clone()));
        // Day-first layouts win when the lenient parser is off.
        assert_eq!(converter.parse("1/3/2013"), Some(expected));
        assert_eq!(converter.parse("3/20/2013"), None);
    }

    #[test]
    fn yaml_formats_fill_missing_keys_with_defaults() {
        let formats: DateTimeFormats =
            serde_yaml::from_str("date_formats: ['%d|%m|%Y']\nlenient: false\n").unwrap();
        assert_eq!(formats.date_formats, vec!["%d|%m|%Y".to_string()]);
        assert_eq!(formats.time_formats.len(), TIME_FORMATS.len());
        assert!(!formats.lenient);
        assert!(formats.ensure_valid().is_ok());

        let converter = DateConverter::new(&formats);
        assert_eq!(
            converter.parse("04|07|2021"),
            Some(Value::Date(NaiveDate::from_ymd_opt(2021, 7, 4).unwrap()))
        );
    }

    #[test]
    fn invalid_formats_are_rejected() {
        let formats = DateTimeFormats {
            date_formats: Vec::new(),
            lenient: false,
            ..DateTimeFormats::default()
        };
        assert!(formats.ensure_valid().is_err());
    }
}
