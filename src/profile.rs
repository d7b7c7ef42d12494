use std::{collections::HashSet, fmt};

use serde::Serialize;

use crate::registry::{EMPTY_TYPE, FLOAT_TYPE, INT_TYPE, NONE_TYPE};

/// Default number of examples kept per type.
pub const DEFAULT_SAMPLE_CAP: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct TypeSample {
    name: String,
    count: usize,
    sample: Vec<(usize, Option<String>)>,
    #[serde(skip)]
    sample_set: HashSet<Option<String>>,
    cap: Option<usize>,
    total: Option<usize>,
}

impl TypeSample {
    pub fn new(name: impl Into<String>, cap: Option<usize>) -> Self {
        Self {
            name: name.into(),
            count: 0,
            sample: Vec::new(),
            sample_set: HashSet::new(),
            cap,
            total: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Examples as `(row index, raw value)` in the order they were first seen.
    pub fn sample(&self) -> &[(usize, Option<String>)] {
        &self.sample
    }

    pub fn cap(&self) -> Option<usize> {
        self.cap
    }

    pub fn total(&self) -> Option<usize> {
        self.total
    }

    pub fn increment(&mut self, n: usize) {
        self.count += n;
    }

    /// Keeps `value` as an example unless the cap is reached or the value was
    /// already kept. Returns whether it was added.
    pub fn add_example(&mut self, index: usize, value: Option<&str>) -> bool {
        if self.cap.is_some_and(|cap| self.sample.len() >= cap) {
            return false;
        }
        let owned = value.map(str::to_string);
        if !self.sample_set.insert(owned.clone()) {
            return false;
        }
        self.sample.push((index, owned));
        true
    }

    /// Share of the finalized total classified as this type; `0.0` before
    /// finalization or for an empty pass.
    pub fn frequency(&self) -> f64 {
        match self.total {
            Some(total) if total > 0 => self.count as f64 / total as f64,
            _ => 0.0,
        }
    }

    fn set_total(&mut self, total: usize) {
        self.total = Some(total);
    }
}

/// The single classification chosen for a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InferredType {
    pub name: String,
    pub count: usize,
}

impl InferredType {
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

impl PartialEq<(&str, usize)> for InferredType {
    fn eq(&self, other: &(&str, usize)) -> bool {
        self.name == other.0 && self.count == other.1
    }
}

impl fmt::Display for InferredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.count)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeProfile {
    types: Vec<TypeSample>,
    sample_cap: Option<usize>,
    total: Option<usize>,
}

impl Default for TypeProfile {
    fn default() -> Self {
        Self::new(Some(DEFAULT_SAMPLE_CAP))
    }
}

impl TypeProfile {
    pub fn new(sample_cap: Option<usize>) -> Self {
        Self {
            types: Vec::new(),
            sample_cap,
            total: None,
        }
    }

    /// Counts one value under `type_name` (`"none"` when absent) and offers
    /// it as an example.
    pub fn record(&mut self, type_name: Option<&str>, index: usize, value: Option<&str>) {
        let name = type_name.unwrap_or(NONE_TYPE);
        let idx = match self.types.iter().position(|t| t.name == name) {
            Some(idx) => idx,
            None => {
                let mut created = TypeSample::new(name, self.sample_cap);
                created.total = self.total;
                self.types.push(created);
                self.types.len() - 1
            }
        };
        let sample = &mut self.types[idx];
        sample.increment(1);
        sample.add_example(index, value);
    }

    /// Sets the row count of the pass on the profile and every sample.
    pub fn finalize(&mut self, total: usize) {
        self.total = Some(total);
        for sample in &mut self.types {
            sample.set_total(total);
        }
    }

    pub fn get(&self, name: &str) -> Option<&TypeSample> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Samples in first-seen order.
    pub fn types(&self) -> &[TypeSample] {
        &self.types
    }

    pub fn total(&self) -> Option<usize> {
        self.total
    }

    pub fn sample_cap(&self) -> Option<usize> {
        self.sample_cap
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Type names with their counts, most frequent first. Equal counts keep
    /// first-seen order.
    pub fn ranked(&self, limit: Option<usize>) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .types
            .iter()
            .map(|t| (t.name.as_str(), t.count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        if let Some(limit) = limit {
            ranked.truncate(limit);
        }
        ranked
    }

    /// Reduces the profile to one type.
    ///
    /// Missing values only decide the result when nothing else was seen, in
    /// which case the column is reported as `"empty"`. An `"int"` result is
    /// promoted to `"float"` (with the float count) whenever any float was
    /// seen. Returns `None` for a profile with nothing recorded.
    pub fn inferred_type(&self) -> Option<InferredType> {
        let ranked = self.ranked(None);
        let &(top, top_count) = ranked.first()?;

        let (name, count) = if top == NONE_TYPE {
            match ranked.get(1) {
                Some(&(second, second_count)) => (second, second_count),
                None => return Some(InferredType::new(EMPTY_TYPE, top_count)),
            }
        } else {
            (top, top_count)
        };

        if name == INT_TYPE
            && let Some(float) = self.get(FLOAT_TYPE)
        {
            return Some(InferredType::new(FLOAT_TYPE, float.count));
        }
        Some(InferredType::new(name, count))
    }
}

/// `{}` shows the inferred type; `{:#}` shows every type as ranked, with
/// missing values and int/float promotion left as counted.
impl fmt::Display for TypeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if f.alternate() {
            for (idx, (name, count)) in self.ranked(None).into_iter().enumerate() {
                if idx > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{name}={count}")?;
            }
            return Ok(());
        }
        match self.inferred_type() {
            Some(inferred) => write!(f, "{inferred}"),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_of(types: &[&str]) -> TypeProfile {
        let mut profile = TypeProfile::default();
        for (idx, name) in types.iter().copied().enumerate() {
            profile.record(Some(name), idx, Some(idx.to_string().as_str()));
        }
        profile.finalize(types.len());
        profile
    }

    #[test]
    fn add_example_skips_duplicates_and_respects_cap() {
        let mut sample = TypeSample::new("int", Some(2));
        assert!(sample.add_example(0, Some("1")));
        assert!(!sample.add_example(1, Some("1")));
        assert!(sample.add_example(2, None));
        assert!(!sample.add_example(3, Some("3")));
        assert_eq!(
            sample.sample(),
            &[(0, Some("1".to_string())), (2, None)]
        );
    }

    #[test]
    fn unbounded_cap_keeps_every_distinct_value() {
        let mut sample = TypeSample::new("int", None);
        for idx in 0..50 {
            sample.add_example(idx, Some((idx % 25).to_string().as_str()));
        }
        assert_eq!(sample.sample().len(), 25);
    }

    #[test]
    fn frequency_requires_total() {
        let mut sample = TypeSample::new("float", None);
        sample.increment(3);
        assert_eq!(sample.frequency(), 0.0);
        sample.set_total(4);
        assert_eq!(sample.frequency(), 0.75);
        sample.set_total(0);
        assert_eq!(sample.frequency(), 0.0);
    }

    #[test]
    fn record_defaults_absent_type_to_none() {
        let mut profile = TypeProfile::default();
        profile.record(None, 0, None);
        assert_eq!(profile.get(NONE_TYPE).map(TypeSample::count), Some(1));
    }

    #[test]
    fn ranked_breaks_ties_by_first_seen() {
        let profile = profile_of(&["bool", "int", "int", "bool", "date"]);
        assert_eq!(
            profile.ranked(None),
            vec![("bool", 2), ("int", 2), ("date", 1)]
        );
        assert_eq!(profile.ranked(Some(1)), vec![("bool", 2)]);
    }

    #[test]
    fn all_missing_reports_empty() {
        let profile = profile_of(&["none", "none"]);
        assert_eq!(profile.inferred_type().unwrap(), ("empty", 2));
    }

    #[test]
    fn mostly_missing_reports_second_type() {
        let profile = profile_of(&["none", "none", "none", "date"]);
        assert_eq!(profile.inferred_type().unwrap(), ("date", 1));
    }

    #[test]
    fn mostly_missing_int_promotes_to_float() {
        let profile = profile_of(&["none", "none", "none", "int", "int", "float"]);
        assert_eq!(profile.inferred_type().unwrap(), ("float", 1));
    }

    #[test]
    fn int_majority_promotes_to_float() {
        let profile = profile_of(&["float", "int", "int", "int"]);
        assert_eq!(profile.inferred_type().unwrap(), ("float", 1));
        assert_eq!(profile.to_string(), "float=1");
        assert_eq!(format!("{profile:#}"), "int=3, float=1");
    }

    #[test]
    fn alternate_display_keeps_missing_values() {
        let profile = profile_of(&["none", "none", "date"]);
        assert_eq!(format!("{profile}"), "date=1");
        assert_eq!(format!("{profile:#}"), "none=2, date=1");
        assert_eq!(format!("{:#}", TypeProfile::default()), "");
    }

    #[test]
    fn non_numeric_majority_is_kept() {
        let profile = profile_of(&["string", "string", "int", "float"]);
        assert_eq!(profile.inferred_type().unwrap(), ("string", 2));
    }

    #[test]
    fn finalize_reaches_every_sample() {
        let profile = profile_of(&["int", "none", "float"]);
        assert_eq!(profile.total(), Some(3));
        assert!(profile.types().iter().all(|t| t.total() == Some(3)));
    }

    #[test]
    fn empty_profile_has_no_inferred_type() {
        let profile = TypeProfile::new(None);
        assert!(profile.is_empty());
        assert_eq!(profile.inferred_type(), None);
        assert_eq!(profile.to_string(), "");
    }
}
