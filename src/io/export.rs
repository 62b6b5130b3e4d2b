//! Tabular export of verification results (CSV and SpreadsheetML).
//!
//! Exported rows carry the original source columns when available, then the
//! address and three derived columns: `validation`, `catch_all` and `risk_level`.

use crate::core::error::{AppError, Result};
use crate::core::models::{VerificationResult, VerificationStatus};
use crate::utils::csv::{parse_records, write_records};
use crate::verification::classifier::{classify, RiskLevel};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::path::Path;

const EMAIL_COLUMN: &str = "email";
const DERIVED_COLUMNS: [&str; 3] = ["validation", "catch_all", "risk_level"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Excel => "xls",
        }
    }
}

/// Which results to keep. A result is exported when any enabled filter matches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportFilters {
    pub valid: bool,
    pub invalid: bool,
    pub catch_all: bool,
    pub safe: bool,
    pub medium: bool,
    pub high: bool,
}

impl Default for ExportFilters {
    fn default() -> Self {
        Self {
            valid: true,
            invalid: true,
            catch_all: true,
            safe: true,
            medium: true,
            high: true,
        }
    }
}

impl ExportFilters {
    /// No filter enabled; combine with struct update syntax to pick some.
    pub fn none() -> Self {
        Self {
            valid: false,
            invalid: false,
            catch_all: false,
            safe: false,
            medium: false,
            high: false,
        }
    }

    pub fn matches(&self, result: &VerificationResult) -> bool {
        let risk_match = match classify(result) {
            RiskLevel::Safe => self.safe,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        };
        risk_match
            || (self.valid && result.status == VerificationStatus::Valid)
            || (self.invalid && result.status == VerificationStatus::Invalid)
            || (self.catch_all && result.is_catch_all)
    }
}

pub fn filter_results<'a>(
    results: &'a [VerificationResult],
    filters: &ExportFilters,
) -> Vec<&'a VerificationResult> {
    results.iter().filter(|r| filters.matches(r)).collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    /// Lays out the export. Source columns follow `column_order` (normally the
    /// input file's header); columns it does not list come after, sorted.
    pub fn build(results: &[&VerificationResult], column_order: &[String]) -> Self {
        let present: BTreeSet<&str> = results
            .iter()
            .filter_map(|r| r.original_row.as_ref())
            .flat_map(|row| row.keys().map(String::as_str))
            .collect();

        let mut columns: Vec<String> = column_order
            .iter()
            .filter(|c| present.contains(c.as_str()))
            .cloned()
            .collect();
        for name in &present {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        columns.retain(|c| !DERIVED_COLUMNS.contains(&c.as_str()));
        if !columns.iter().any(|c| c == EMAIL_COLUMN) {
            columns.push(EMAIL_COLUMN.to_string());
        }
        columns.extend(DERIVED_COLUMNS.iter().map(|c| c.to_string()));

        let rows = results
            .iter()
            .map(|result| {
                columns
                    .iter()
                    .map(|column| cell_value(result, column))
                    .collect()
            })
            .collect();

        Self { columns, rows }
    }

    pub fn to_csv(&self) -> String {
        write_records(std::iter::once(&self.columns).chain(self.rows.iter()))
    }

    /// SpreadsheetML 2003 workbook with a single sheet; every cell is a string.
    pub fn to_excel_xml(&self) -> String {
        let mut xml = String::from(
            "<?xml version=\"1.0\"?><?mso-application progid=\"Excel.Sheet\"?>\
             <Workbook xmlns=\"urn:schemas-microsoft-com:office:spreadsheet\" \
             xmlns:o=\"urn:schemas-microsoft-com:office:office\" \
             xmlns:x=\"urn:schemas-microsoft-com:office:excel\" \
             xmlns:ss=\"urn:schemas-microsoft-com:office:spreadsheet\">\
             <Worksheet ss:Name=\"Sheet1\"><Table>",
        );
        for row in std::iter::once(&self.columns).chain(self.rows.iter()) {
            xml.push_str("<Row>");
            for cell in row {
                xml.push_str("<Cell><Data ss:Type=\"String\">");
                xml.push_str(&escape_xml(cell));
                xml.push_str("</Data></Cell>");
            }
            xml.push_str("</Row>");
        }
        xml.push_str("</Table></Worksheet></Workbook>");
        xml
    }

    pub fn render(&self, format: ExportFormat) -> String {
        match format {
            ExportFormat::Csv => self.to_csv(),
            ExportFormat::Excel => self.to_excel_xml(),
        }
    }

    pub fn write_to(&self, path: &Path, format: ExportFormat) -> Result<()> {
        std::fs::write(path, self.render(format)).map_err(|e| {
            AppError::Export(format!("Failed to write '{}': {}", path.display(), e))
        })?;
        tracing::info!(
            target: "export",
            "Exported {} row(s) to {}",
            self.rows.len(),
            path.display()
        );
        Ok(())
    }
}

fn cell_value(result: &VerificationResult, column: &str) -> String {
    match column {
        "validation" => {
            let label = if result.status == VerificationStatus::Valid {
                "Valid"
            } else {
                "Invalid"
            };
            label.to_string()
        }
        "catch_all" => {
            let label = if result.is_catch_all { "Yes" } else { "No" };
            label.to_string()
        }
        "risk_level" => classify(result).to_string(),
        // The verified address, even when the source row's own `email` cell differs.
        EMAIL_COLUMN => result.email.clone(),
        _ => result
            .original_row
            .as_ref()
            .and_then(|row| row.get(column))
            .cloned()
            .unwrap_or_default(),
    }
}

fn escape_xml(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// `email-verification-export-<date>.<ext>`
pub fn default_file_name(format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "email-verification-export-{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// The columns of an exported row that identify its verification outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportProjection {
    pub email: String,
    pub validation: String,
    pub catch_all: String,
    pub risk_level: String,
}

impl ExportProjection {
    pub fn of(result: &VerificationResult) -> Self {
        Self {
            email: result.email.clone(),
            validation: cell_value(result, "validation"),
            catch_all: cell_value(result, "catch_all"),
            risk_level: cell_value(result, "risk_level"),
        }
    }
}

/// Reads an exported CSV back into its outcome columns.
pub fn parse_export_csv(text: &str) -> Result<Vec<ExportProjection>> {
    let mut records = parse_records(text).into_iter();
    let header = records
        .next()
        .ok_or_else(|| AppError::Export("Export is empty".to_string()))?;
    let position = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AppError::Export(format!("Export has no '{}' column", name)))
    };
    let email = position(EMAIL_COLUMN)?;
    let validation = position("validation")?;
    let catch_all = position("catch_all")?;
    let risk_level = position("risk_level")?;

    let field = |record: &[String], i: usize| record.get(i).cloned().unwrap_or_default();
    Ok(records
        .map(|record| ExportProjection {
            email: field(&record, email),
            validation: field(&record, validation),
            catch_all: field(&record, catch_all),
            risk_level: field(&record, risk_level),
        })
        .collect())
}
