//! Turns text and CSV input into a deduplicated address list plus the source
//! rows used to enrich exports.

use crate::core::error::{AppError, Result};
use crate::core::models::{OriginalRow, RowIndex};
use crate::utils::address::{dedupe_preserving_order, has_valid_shape, parse_addresses_from_text};
use crate::utils::csv::parse_records;
use std::path::Path;

/// One data row of a CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    /// First cell in the row that looks like an address.
    pub email: Option<String>,
    pub columns: OriginalRow,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputBatch {
    pub emails: Vec<String>,
    /// Column names in file order; empty for plain text input.
    pub headers: Vec<String>,
    pub rows: Vec<SourceRow>,
}

impl InputBatch {
    /// Addresses separated by newlines, commas or semicolons.
    pub fn from_text(text: &str) -> Self {
        Self {
            emails: parse_addresses_from_text(text),
            ..Self::default()
        }
    }

    /// Addresses given individually, e.g. as command-line arguments.
    pub fn from_addresses<I, T>(addresses: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let emails = addresses
            .into_iter()
            .map(|a| a.as_ref().trim().to_string())
            .filter(|a| has_valid_shape(a));
        Self {
            emails: dedupe_preserving_order(emails),
            ..Self::default()
        }
    }

    /// CSV with a header line. The first well-shaped cell of each row is that
    /// row's address.
    pub fn from_csv(text: &str) -> Result<Self> {
        let mut records = parse_records(text).into_iter();
        let headers: Vec<String> = match records.next() {
            Some(header) => header.into_iter().map(|h| h.trim().to_string()).collect(),
            None => {
                return Err(AppError::InsufficientInput(
                    "CSV input is empty".to_string(),
                ))
            }
        };

        let mut rows = Vec::new();
        for record in records {
            let cells: Vec<String> = record.into_iter().map(|c| c.trim().to_string()).collect();
            let columns: OriginalRow = headers
                .iter()
                .enumerate()
                .filter(|(_, name)| !name.is_empty())
                .map(|(i, name)| (name.clone(), cells.get(i).cloned().unwrap_or_default()))
                .collect();
            let email = cells.iter().find(|c| has_valid_shape(c)).cloned();
            rows.push(SourceRow { email, columns });
        }

        let emails = dedupe_preserving_order(rows.iter().filter_map(|r| r.email.clone()));
        tracing::debug!(
            "Parsed CSV: {} column(s), {} row(s), {} unique address(es)",
            headers.len(),
            rows.len(),
            emails.len()
        );
        Ok(Self {
            emails,
            headers,
            rows,
        })
    }

    pub fn load_text_file(path: &Path) -> Result<Self> {
        Ok(Self::from_text(&std::fs::read_to_string(path)?))
    }

    pub fn load_csv_file(path: &Path) -> Result<Self> {
        Self::from_csv(&std::fs::read_to_string(path)?)
    }

    /// Source rows keyed by address. When an address appears on several rows
    /// the first one wins.
    pub fn row_index(&self) -> RowIndex {
        let mut index = RowIndex::new();
        for row in &self.rows {
            if let Some(email) = &row.email {
                index
                    .entry(email.clone())
                    .or_insert_with(|| row.columns.clone());
            }
        }
        index
    }

    /// Appends the addresses of `other`, keeping first occurrences.
    pub fn merge(&mut self, other: InputBatch) {
        let combined = std::mem::take(&mut self.emails)
            .into_iter()
            .chain(other.emails);
        self.emails = dedupe_preserving_order(combined);
        for header in other.headers {
            if !self.headers.contains(&header) {
                self.headers.push(header);
            }
        }
        self.rows.extend(other.rows);
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
