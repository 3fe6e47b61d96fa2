//! # Sync Entities
//!
//! Identifiers read from the spreadsheet, the status/date pair scraped for
//! each of them, and the ordered table a cycle produces.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque token naming one organization in the portal.
///
/// Sourced once from the codes range at startup; the position in the list
/// matters because results are written back positionally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityIdentifier(String);

impl EntityIdentifier {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert a raw spreadsheet cell into an identifier.
    ///
    /// The backend hands numeric codes back as JSON numbers when the sheet
    /// stores them as numbers, so both shapes are accepted. Nulls, booleans
    /// and nested values are not identifiers.
    #[must_use]
    pub fn from_cell(cell: &serde_json::Value) -> Option<Self> {
        match cell {
            serde_json::Value::String(s) => Some(Self::new(s.clone())),
            serde_json::Value::Number(n) => Some(Self::new(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for EntityIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityIdentifier {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Status and upload date of one organization's report.
///
/// Both fields are read from the same parsed document, so a failed fetch or
/// parse yields both absent together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: Option<String>,
    pub upload_date: Option<String>,
}

impl StatusRecord {
    #[must_use]
    pub fn new(status: Option<String>, upload_date: Option<String>) -> Self {
        Self { status, upload_date }
    }

    /// Record for an entity whose page had no data or could not be fetched.
    #[must_use]
    pub const fn absent() -> Self {
        Self {
            status: None,
            upload_date: None,
        }
    }

    #[must_use]
    pub const fn is_absent(&self) -> bool {
        self.status.is_none() && self.upload_date.is_none()
    }
}

/// Ordered identifier → record table built by one collection pass.
///
/// Insertion order is the input identifier order, and every input
/// identifier gets exactly one entry (duplicates included), so
/// `len() == identifiers.len()` always holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTable {
    entries: Vec<(EntityIdentifier, StatusRecord)>,
}

impl ResultTable {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, identifier: EntityIdentifier, record: StatusRecord) {
        self.entries.push((identifier, record));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First record stored for `identifier`.
    #[must_use]
    pub fn get(&self, identifier: &EntityIdentifier) -> Option<&StatusRecord> {
        self.entries
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, record)| record)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(EntityIdentifier, StatusRecord)> {
        self.entries.iter()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &EntityIdentifier> {
        self.entries.iter().map(|(id, _)| id)
    }

    /// Status column in identifier order, `None` where absent.
    #[must_use]
    pub fn statuses(&self) -> Vec<Option<String>> {
        self.entries.iter().map(|(_, r)| r.status.clone()).collect()
    }

    /// Upload-date column in identifier order, `None` where absent.
    #[must_use]
    pub fn upload_dates(&self) -> Vec<Option<String>> {
        self.entries
            .iter()
            .map(|(_, r)| r.upload_date.clone())
            .collect()
    }

    /// Number of fully absent records.
    #[must_use]
    pub fn absent_count(&self) -> usize {
        self.entries.iter().filter(|(_, r)| r.is_absent()).count()
    }

    /// Length of the longest run of consecutive fully absent records.
    #[must_use]
    pub fn longest_absent_run(&self) -> usize {
        let mut longest = 0;
        let mut current = 0;
        for (_, record) in &self.entries {
            if record.is_absent() {
                current += 1;
                longest = longest.max(current);
            } else {
                current = 0;
            }
        }
        longest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rec(status: &str, date: &str) -> StatusRecord {
        StatusRecord::new(Some(status.to_string()), Some(date.to_string()))
    }

    #[test]
    fn identifier_from_string_and_number_cells() {
        assert_eq!(
            EntityIdentifier::from_cell(&json!("4521")),
            Some(EntityIdentifier::new("4521"))
        );
        assert_eq!(
            EntityIdentifier::from_cell(&json!(4521)),
            Some(EntityIdentifier::new("4521"))
        );
        assert_eq!(EntityIdentifier::from_cell(&json!(null)), None);
        assert_eq!(EntityIdentifier::from_cell(&json!(true)), None);
    }

    #[test]
    fn table_keeps_duplicates_and_order() {
        let mut table = ResultTable::default();
        table.insert("A".into(), rec("s1", "d1"));
        table.insert("B".into(), StatusRecord::absent());
        table.insert("A".into(), rec("s3", "d3"));

        assert_eq!(table.len(), 3);
        assert_eq!(
            table.identifiers().map(EntityIdentifier::as_str).collect::<Vec<_>>(),
            vec!["A", "B", "A"]
        );
        assert_eq!(table.get(&"A".into()), Some(&rec("s1", "d1")));
        assert_eq!(
            table.statuses(),
            vec![Some("s1".to_string()), None, Some("s3".to_string())]
        );
        assert_eq!(
            table.upload_dates(),
            vec![Some("d1".to_string()), None, Some("d3".to_string())]
        );
    }

    #[test]
    fn absent_run_counting() {
        let mut table = ResultTable::default();
        table.insert("A".into(), StatusRecord::absent());
        table.insert("B".into(), rec("s", "d"));
        table.insert("C".into(), StatusRecord::absent());
        table.insert("D".into(), StatusRecord::absent());

        assert_eq!(table.absent_count(), 3);
        assert_eq!(table.longest_absent_run(), 2);
        assert_eq!(ResultTable::default().longest_absent_run(), 0);
    }
}
