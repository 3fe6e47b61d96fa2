//! A1-notation ranges and the write-option enums of the spreadsheet backend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::errors::RangeError;

/// How the backend treats written values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValueInputOption {
    /// Stored verbatim.
    Raw,
    /// Parsed as if typed by a user (dates and numbers may be reformatted).
    UserEntered,
}

impl ValueInputOption {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raw => "RAW",
            Self::UserEntered => "USER_ENTERED",
        }
    }
}

/// Layout of a flat value list inside a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MajorDimension {
    Rows,
    Columns,
}

/// One end of an A1 range. Either part may be missing (`A:A`, `2:5`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    /// 1-based column index.
    pub column: Option<u32>,
    /// 1-based row index.
    pub row: Option<u32>,
}

impl CellRef {
    fn parse(raw: &str, whole: &str) -> Result<Self, RangeError> {
        let invalid = || RangeError::InvalidCell {
            range: whole.to_string(),
            cell: raw.to_string(),
        };

        let split = raw
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(raw.len());
        let (letters, digits) = raw.split_at(split);
        if letters.is_empty() && digits.is_empty() {
            return Err(invalid());
        }
        if letters.len() > 3 || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let column = if letters.is_empty() {
            None
        } else {
            Some(
                letters
                    .chars()
                    .map(|c| u32::from(c.to_ascii_uppercase() as u8 - b'A') + 1)
                    .fold(0, |acc, v| acc * 26 + v),
            )
        };
        let row = if digits.is_empty() {
            None
        } else {
            match digits.parse::<u32>() {
                Ok(0) | Err(_) => return Err(invalid()),
                Ok(n) => Some(n),
            }
        };

        Ok(Self { column, row })
    }
}

/// A validated A1-notation range such as `Sheet1!H2:H163` or `Sheet1!J3`.
///
/// The text as written is kept and sent to the backend unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetRange {
    raw: String,
    sheet: Option<String>,
    start: CellRef,
    end: Option<CellRef>,
}

impl SheetRange {
    pub fn parse(raw: &str) -> Result<Self, RangeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(RangeError::Empty);
        }

        let (sheet, cells) = match trimmed.rfind('!') {
            Some(idx) => {
                let name = trimmed[..idx].trim_matches('\'');
                if name.is_empty() {
                    return Err(RangeError::MissingSheetName(trimmed.to_string()));
                }
                (Some(name.to_string()), &trimmed[idx + 1..])
            }
            None => (None, trimmed),
        };

        let (start, end) = match cells.split_once(':') {
            Some((a, b)) => (
                CellRef::parse(a, trimmed)?,
                Some(CellRef::parse(b, trimmed)?),
            ),
            None => (CellRef::parse(cells, trimmed)?, None),
        };

        Ok(Self {
            raw: trimmed.to_string(),
            sheet,
            start,
            end,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    /// True for a single-cell reference like `J3`.
    #[must_use]
    pub fn is_single_cell(&self) -> bool {
        let end_matches = self.end.is_none_or(|end| end == self.start);
        end_matches && self.start.column.is_some() && self.start.row.is_some()
    }

    /// Number of rows covered, when both ends name a row.
    #[must_use]
    pub fn row_span(&self) -> Option<u32> {
        let first = self.start.row?;
        let last = match self.end {
            Some(end) => end.row?,
            None => first,
        };
        Some(last.abs_diff(first) + 1)
    }

    /// Number of columns covered, when both ends name a column.
    #[must_use]
    pub fn column_span(&self) -> Option<u32> {
        let first = self.start.column?;
        let last = match self.end {
            Some(end) => end.column?,
            None => first,
        };
        Some(last.abs_diff(first) + 1)
    }

    /// How many values fit along `dimension` in the first row/column.
    #[must_use]
    pub fn capacity_along(&self, dimension: MajorDimension) -> Option<u32> {
        match dimension {
            MajorDimension::Columns => self.row_span(),
            MajorDimension::Rows => self.column_span(),
        }
    }
}

impl FromStr for SheetRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for SheetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for SheetRange {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for SheetRange {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Sheet1!H2:H163", Some("Sheet1"), Some(162), Some(1))]
    #[case("Sheet1!J3", Some("Sheet1"), Some(1), Some(1))]
    #[case("'Report Q1'!A2:C4", Some("Report Q1"), Some(3), Some(3))]
    #[case("A:A", None, None, Some(1))]
    #[case("b10:aa10", None, Some(1), Some(26))]
    fn parses_valid_ranges(
        #[case] raw: &str,
        #[case] sheet: Option<&str>,
        #[case] rows: Option<u32>,
        #[case] columns: Option<u32>,
    ) {
        let range = SheetRange::parse(raw).unwrap();
        assert_eq!(range.sheet(), sheet);
        assert_eq!(range.row_span(), rows);
        assert_eq!(range.column_span(), columns);
        assert_eq!(range.as_str(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("!A1")]
    #[case("Sheet1!")]
    #[case("Sheet1!A0")]
    #[case("Sheet1!ABCD1")]
    #[case("Sheet1!A1:")]
    #[case("Sheet1!1A")]
    fn rejects_invalid_ranges(#[case] raw: &str) {
        assert!(SheetRange::parse(raw).is_err(), "{raw} should not parse");
    }

    #[test]
    fn single_cell_detection() {
        assert!(SheetRange::parse("Sheet1!J3").unwrap().is_single_cell());
        assert!(SheetRange::parse("Sheet1!J3:J3").unwrap().is_single_cell());
        assert!(!SheetRange::parse("Sheet1!H2:H163").unwrap().is_single_cell());
    }

    #[test]
    fn capacity_follows_major_dimension() {
        let range = SheetRange::parse("Sheet1!G2:G163").unwrap();
        assert_eq!(range.capacity_along(MajorDimension::Columns), Some(162));
        assert_eq!(range.capacity_along(MajorDimension::Rows), Some(1));
    }

    #[test]
    fn write_options_serialize_to_backend_names() {
        assert_eq!(serde_json::to_value(ValueInputOption::Raw).unwrap(), "RAW");
        assert_eq!(
            serde_json::to_value(ValueInputOption::UserEntered).unwrap(),
            "USER_ENTERED"
        );
        assert_eq!(
            serde_json::to_value(MajorDimension::Columns).unwrap(),
            "COLUMNS"
        );
    }
}
