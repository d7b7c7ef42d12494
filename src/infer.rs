use log::debug;

use crate::{
    profile::{DEFAULT_SAMPLE_CAP, TypeProfile},
    registry::{ConverterRegistry, RawField, STRING_TYPE},
    value::ValueKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InferOptions {
    /// Maximum number of values (or rows) to examine; `None` examines all.
    pub limit: Option<usize>,
    /// Maximum number of distinct examples kept per type; `None` keeps all.
    pub sample_cap: Option<usize>,
}

impl Default for InferOptions {
    fn default() -> Self {
        Self {
            limit: None,
            sample_cap: Some(DEFAULT_SAMPLE_CAP),
        }
    }
}

impl InferOptions {
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_sample_cap(mut self, sample_cap: Option<usize>) -> Self {
        self.sample_cap = sample_cap;
        self
    }

    fn row_budget(&self) -> usize {
        self.limit.unwrap_or(usize::MAX)
    }
}

impl ConverterRegistry {
    /// Name of the converter that claims `text`, or `None` when none does.
    pub fn infer(&self, text: Option<&str>) -> Option<&str> {
        self.convert_with_type(text).1
    }

    /// Native kind of the converted value, or `None` when no converter
    /// claims `text`.
    pub fn infer_kind(&self, text: Option<&str>) -> Option<ValueKind> {
        match self.convert_with_type(text) {
            (value, Some(_)) => Some(value.kind()),
            (_, None) => None,
        }
    }

    fn classify(&self, text: Option<&str>) -> &str {
        self.infer(text).unwrap_or(STRING_TYPE)
    }

    /// Profiles up to `options.limit` values. Returns `None` when no value
    /// was examined.
    pub fn infer_series<I>(&self, values: I, options: InferOptions) -> Option<TypeProfile>
    where
        I: IntoIterator,
        I::Item: RawField,
    {
        let mut profile = TypeProfile::new(options.sample_cap);
        let mut processed = 0usize;
        for (index, value) in values.into_iter().take(options.row_budget()).enumerate() {
            let raw = value.raw();
            profile.record(Some(self.classify(raw)), index, raw);
            processed += 1;
        }

        if processed == 0 {
            debug!("No values to infer from");
            return None;
        }
        profile.finalize(processed);
        debug!("Inferred {profile} from {processed} value(s)");
        Some(profile)
    }

    /// Profiles each column of a row-major table, returning one profile per
    /// column of the first row.
    ///
    /// Cells past the first row's width are ignored. A shorter row simply
    /// contributes nothing to its missing columns. Every profile is finalized
    /// with the number of rows examined.
    pub fn infer_matrix<R>(&self, rows: R, options: InferOptions) -> Vec<TypeProfile>
    where
        R: IntoIterator,
        R::Item: IntoIterator,
        <R::Item as IntoIterator>::Item: RawField,
    {
        let mut profiles: Vec<TypeProfile> = Vec::new();
        let mut processed = 0usize;

        for (row_index, row) in rows.into_iter().take(options.row_budget()).enumerate() {
            let mut width = 0usize;
            for (column, value) in row.into_iter().enumerate() {
                width += 1;
                if row_index == 0 {
                    profiles.push(TypeProfile::new(options.sample_cap));
                }
                let Some(profile) = profiles.get_mut(column) else {
                    continue;
                };
                let raw = value.raw();
                profile.record(Some(self.classify(raw)), row_index, raw);
            }
            if width != profiles.len() {
                debug!(
                    "Row {row_index} has {width} cell(s), expected {}",
                    profiles.len()
                );
            }
            processed += 1;
        }

        for profile in &mut profiles {
            profile.finalize(processed);
        }
        debug!(
            "Inferred {} column(s) from {processed} row(s)",
            profiles.len()
        );
        profiles
    }
}
