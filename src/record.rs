//! Records: one row of a task or output table.
//!
//! A [`Record`] is an ordered string-to-string mapping. Key order follows the
//! table header it was read from (or the order fields arrived in a form
//! submission) and is preserved when the record is written back out.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One row of a table, keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, String>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a record from a header row and a matching row of values.
    pub fn from_row<H, V>(headers: H, values: V) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let fields: IndexMap<String, String> = headers
            .into_iter()
            .map(Into::into)
            .zip(values.into_iter().map(Into::into))
            .collect();
        Self { fields }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy of this record with every value passed through [`normalize_value`].
    ///
    /// Keys and key order are untouched. Normalizing twice yields the same
    /// record as normalizing once.
    pub fn normalized(&self) -> Record {
        self.iter()
            .map(|(k, v)| (k.to_string(), normalize_value(v)))
            .collect()
    }

    /// True if every field of `other` appears in `self` with an equal value.
    ///
    /// Extra fields in `self` are ignored. Values are compared as-is, so both
    /// sides should already be normalized.
    pub fn is_superset_of(&self, other: &Record) -> bool {
        other
            .iter()
            .all(|(k, v)| self.get(k).is_some_and(|mine| mine == v))
    }
}

impl FromIterator<(String, String)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Record {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        iter.into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// Canonicalize a single field value.
///
/// Drops a leading byte-order mark, folds `\r\n` and lone `\r` line endings to
/// `\n`, and trims surrounding whitespace. Form posts come back with CRLF line
/// endings while spreadsheet exports vary, so raw values are never compared.
pub fn normalize_value(value: &str) -> String {
    let folded = if value.contains('\r') {
        value.replace("\r\n", "\n").replace('\r', "\n")
    } else {
        value.to_string()
    };
    folded
        .trim_start_matches(|c: char| c == '\u{feff}' || c.is_whitespace())
        .trim_end()
        .to_string()
}
