//! Ordered, named converters tried first-match-wins.

use std::fmt;

use log::{debug, trace};

use crate::{
    converters::{
        DateConverter, DateTimeConverter, DateTimeFormats, TimeConverter, convert_bool,
        convert_float, convert_int, convert_none,
    },
    error::{Error, Result},
    value::Value,
};

pub const NONE_TYPE: &str = "none";
pub const INT_TYPE: &str = "int";
pub const FLOAT_TYPE: &str = "float";
pub const BOOL_TYPE: &str = "bool";
pub const TIME_TYPE: &str = "time";
pub const DATETIME_TYPE: &str = "datetime";
pub const DATE_TYPE: &str = "date";
/// Recorded during inference for text that no converter claims.
pub const STRING_TYPE: &str = "string";
/// Reported by [`TypeProfile::inferred_type`](crate::profile::TypeProfile::inferred_type)
/// for a column holding nothing but missing values.
pub const EMPTY_TYPE: &str = "empty";

/// Token that missing and empty input is rewritten to before conversion.
pub const MISSING_TOKEN: &str = "None";

/// Parses text into a typed value, or returns `None` when the text is not of
/// this converter's type. Implementations must not have side effects.
pub trait Converter: Send + Sync {
    fn convert(&self, text: &str) -> Option<Value>;
}

impl<F> Converter for F
where
    F: Fn(&str) -> Option<Value> + Send + Sync,
{
    fn convert(&self, text: &str) -> Option<Value> {
        self(text)
    }
}

impl Converter for TimeConverter {
    fn convert(&self, text: &str) -> Option<Value> {
        self.parse(text)
    }
}

impl Converter for DateTimeConverter {
    fn convert(&self, text: &str) -> Option<Value> {
        self.parse(text)
    }
}

impl Converter for DateConverter {
    fn convert(&self, text: &str) -> Option<Value> {
        self.parse(text)
    }
}

/// A raw cell handed to the registry: text, or `None` when missing.
pub trait RawField {
    fn raw(&self) -> Option<&str>;
}

impl RawField for str {
    fn raw(&self) -> Option<&str> {
        Some(self)
    }
}

impl RawField for String {
    fn raw(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl<T: AsRef<str>> RawField for Option<T> {
    fn raw(&self) -> Option<&str> {
        self.as_ref().map(|value| value.as_ref())
    }
}

impl<T: RawField + ?Sized> RawField for &T {
    fn raw(&self) -> Option<&str> {
        (**self).raw()
    }
}

/// Rewrites missing and empty input to [`MISSING_TOKEN`] so the `none`
/// converter sees it like any other text.
pub fn normalize_missing(text: Option<&str>) -> &str {
    match text {
        None | Some("") => MISSING_TOKEN,
        Some(text) => text,
    }
}

struct Entry {
    name: String,
    converter: Box<dyn Converter>,
}

#[derive(Default)]
pub struct ConverterRegistry {
    entries: Vec<Entry>,
}

impl ConverterRegistry {
    /// An empty registry: every input converts to itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in converters in their default try order, using the given
    /// date/time layouts.
    pub fn with_formats(formats: &DateTimeFormats) -> Self {
        let mut registry = Self::new();
        registry.push(NONE_TYPE, Box::new(convert_none));
        registry.push(INT_TYPE, Box::new(convert_int));
        registry.push(FLOAT_TYPE, Box::new(convert_float));
        registry.push(BOOL_TYPE, Box::new(convert_bool));
        registry.push(TIME_TYPE, Box::new(TimeConverter::new(formats)));
        registry.push(DATETIME_TYPE, Box::new(DateTimeConverter::new(formats)));
        registry.push(DATE_TYPE, Box::new(DateConverter::new(formats)));
        registry
    }

    /// [`with_formats`](Self::with_formats) using the default layouts.
    pub fn builtin() -> Self {
        Self::with_formats(&DateTimeFormats::default())
    }

    fn push(&mut self, name: &str, converter: Box<dyn Converter>) {
        self.entries.push(Entry {
            name: name.to_string(),
            converter,
        });
    }

    /// Registers `converter` under `name`, replacing any converter already
    /// registered under that name.
    ///
    /// With a `priority` inside the current try order the name is placed at
    /// that zero-based position; otherwise it is appended.
    pub fn register<C>(
        &mut self,
        name: impl Into<String>,
        converter: C,
        priority: Option<usize>,
    ) -> Result<()>
    where
        C: Converter + 'static,
    {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidName);
        }
        self.unregister(&name);

        let entry = Entry {
            name,
            converter: Box::new(converter),
        };
        match priority {
            Some(position) if position < self.entries.len() => {
                debug!("Registering converter '{}' at position {position}", entry.name);
                self.entries.insert(position, entry);
            }
            _ => {
                debug!("Registering converter '{}' last", entry.name);
                self.entries.push(entry);
            }
        }
        Ok(())
    }

    /// Removes `name` from the registry. Returns whether it was present.
    pub fn unregister(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.name != name);
        before != self.entries.len()
    }

    pub fn lookup(&self, name: &str) -> Result<&dyn Converter> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.converter.as_ref())
            .ok_or_else(|| Error::NotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|entry| entry.name == name)
    }

    /// Type names in try order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn convert(&self, text: Option<&str>) -> Value {
        self.convert_with_type(text).0
    }

    /// Converts `text` and reports the name of the converter that claimed it.
    /// Unclaimed text comes back unchanged as [`Value::String`] with no name.
    pub fn convert_with_type(&self, text: Option<&str>) -> (Value, Option<&str>) {
        let text = normalize_missing(text);
        for entry in &self.entries {
            if let Some(value) = entry.converter.convert(text) {
                trace!("'{text}' converted by '{}'", entry.name);
                return (value, Some(entry.name.as_str()));
            }
        }
        (Value::String(text.to_string()), None)
    }

    /// Converts an already-typed value: only [`Value::String`] goes through
    /// the converters, every other variant is returned as is.
    pub fn convert_value(&self, value: Value) -> (Value, Option<&str>) {
        match value {
            Value::String(text) => self.convert_with_type(Some(&text)),
            other => (other, None),
        }
    }

    pub fn convert_series<'a, I>(&'a self, values: I) -> impl Iterator<Item = Value> + 'a
    where
        I: IntoIterator + 'a,
        I::Item: RawField,
    {
        values.into_iter().map(move |value| self.convert(value.raw()))
    }

    pub fn convert_series_with_type<'a, I>(
        &'a self,
        values: I,
    ) -> impl Iterator<Item = (Value, Option<&'a str>)> + 'a
    where
        I: IntoIterator + 'a,
        I::Item: RawField,
    {
        values
            .into_iter()
            .map(move |value| self.convert_with_type(value.raw()))
    }

    pub fn convert_matrix<'a, R>(&'a self, rows: R) -> impl Iterator<Item = Vec<Value>> + 'a
    where
        R: IntoIterator + 'a,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: RawField,
    {
        rows.into_iter().map(move |row| {
            row.into_iter()
                .map(|value| self.convert(value.raw()))
                .collect()
        })
    }

    pub fn convert_matrix_with_type<'a, R>(
        &'a self,
        rows: R,
    ) -> impl Iterator<Item = Vec<(Value, Option<&'a str>)>> + 'a
    where
        R: IntoIterator + 'a,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: RawField,
    {
        rows.into_iter().map(move |row| {
            row.into_iter()
                .map(|value| self.convert_with_type(value.raw()))
                .collect()
        })
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("order", &self.names())
            .finish()
    }
}
