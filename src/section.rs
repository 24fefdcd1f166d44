//! Raw section data as delivered by the host framework.
//!
//! Agent and SNMP data arrives as a `StringTable`: ordered rows of
//! ordered string columns. What the columns mean is entirely
//! device-specific and documented per plugin. Some sections carry a
//! single JSON document instead of columnar data.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

pub type StringTable = Vec<Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum SectionError {
    #[error("section is empty")]
    Empty,
    #[error("malformed JSON section: {0}")]
    Json(#[from] serde_json::Error),
}

/// The named sections available to one check invocation.
#[derive(Debug, Default)]
pub struct SectionSet {
    sections: BTreeMap<String, StringTable>,
}

impl SectionSet {
    pub fn new() -> SectionSet {
        SectionSet::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, table: StringTable) {
        self.sections.insert(name.into(), table);
    }

    pub fn with(mut self, name: impl Into<String>, table: StringTable) -> SectionSet {
        self.insert(name, table);
        self
    }

    pub fn get(&self, name: &str) -> Option<&StringTable> {
        self.sections.get(name)
    }
}

/// Splits raw agent text into a table, one row per non-empty line,
/// columns separated by whitespace.
pub fn table_from_str(raw: &str) -> StringTable {
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.split_whitespace().map(str::to_owned).collect())
        .collect()
}

/// Deserializes a section consisting of a single JSON document. The
/// document is expected in the first row; columns are re-joined since
/// the tokenizer may have split the blob on embedded spaces.
pub fn json_section<T: DeserializeOwned>(table: &StringTable) -> Result<T, SectionError> {
    let row = table.first().ok_or(SectionError::Empty)?;
    let raw = row.join(" ");
    Ok(serde_json::from_str(&raw)?)
}

/// Lenient float parsing for device tables. Empty and non-numeric
/// fields are simply absent, callers skip the row or the channel.
pub fn parse_field_f64(field: &str) -> Option<f64> {
    field.trim().parse().ok()
}
