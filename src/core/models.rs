//! Data structures exchanged with the verification service and produced by a batch run.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Source-file columns carried alongside a result for export enrichment.
pub type OriginalRow = BTreeMap<String, String>;

/// Source rows keyed by the address found in them.
pub type RowIndex = HashMap<String, OriginalRow>;

/// Outcome category reported by the verification service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VerificationStatus {
    Valid,
    /// Synonym some service versions use for `valid`.
    Deliverable,
    Invalid,
    CatchAll,
    Error,
    /// Any status string this client does not know about.
    Unknown(String),
}

impl VerificationStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VerificationStatus::Valid => "valid",
            VerificationStatus::Deliverable => "deliverable",
            VerificationStatus::Invalid => "invalid",
            VerificationStatus::CatchAll => "catch-all",
            VerificationStatus::Error => "error",
            VerificationStatus::Unknown(raw) => raw,
        }
    }

    /// `valid` or `deliverable`.
    pub fn is_deliverable(&self) -> bool {
        matches!(
            self,
            VerificationStatus::Valid | VerificationStatus::Deliverable
        )
    }
}

impl From<String> for VerificationStatus {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "valid" => VerificationStatus::Valid,
            "deliverable" => VerificationStatus::Deliverable,
            "invalid" => VerificationStatus::Invalid,
            "catch-all" | "catchall" | "catch_all" => VerificationStatus::CatchAll,
            "error" => VerificationStatus::Error,
            _ => VerificationStatus::Unknown(raw),
        }
    }
}

impl From<VerificationStatus> for String {
    fn from(status: VerificationStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One verification outcome for one address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    pub email: String,
    pub status: VerificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Deliverability confidence in `[0.0, 1.0]`.
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub is_disposable: bool,
    #[serde(default)]
    pub is_free_provider: bool,
    #[serde(default)]
    pub is_role_based: bool,
    #[serde(default)]
    pub is_blacklisted: bool,
    #[serde(default)]
    pub is_catch_all: bool,
    #[serde(default)]
    pub spf: Option<String>,
    #[serde(default)]
    pub dkim: Option<String>,
    #[serde(default)]
    pub dmarc: Option<String>,
    #[serde(
        default,
        rename = "_original",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_row: Option<OriginalRow>,
}

impl VerificationResult {
    /// Builds the placeholder recorded when an address could not be verified.
    pub fn failed(email: &str, reason: impl Into<String>) -> Self {
        Self {
            email: email.to_string(),
            status: VerificationStatus::Error,
            reason: Some(reason.into()),
            domain: domain_of(email),
            score: Some(0.0),
            is_disposable: false,
            is_free_provider: false,
            is_role_based: false,
            is_blacklisted: false,
            is_catch_all: false,
            spf: None,
            dkim: None,
            dmarc: None,
            original_row: None,
        }
    }

    /// True when at least one of SPF, DKIM or DMARC carries a record.
    pub fn has_auth_record(&self) -> bool {
        [&self.spf, &self.dkim, &self.dmarc]
            .iter()
            .any(|record| record.as_deref().is_some_and(|r| !r.trim().is_empty()))
    }
}

fn domain_of(email: &str) -> Option<String> {
    email
        .split_once('@')
        .map(|(_, domain)| domain.to_string())
        .filter(|d| !d.is_empty())
}

/// Outcome-bucket counts over a result set.
///
/// Every result lands in exactly one bucket, so `total == valid + catch_all + invalid`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub valid: usize,
    pub catch_all: usize,
    pub invalid: usize,
}

impl BatchSummary {
    /// Percentage of results that were valid or catch-all, rounded to two decimals.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let rate = (self.valid + self.catch_all) as f64 / self.total as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

/// Client-side snapshot of the account's verification credits.
///
/// Advisory only: the server may refuse a call the snapshot suggested was affordable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBudget {
    #[serde(alias = "verify_credits")]
    pub remaining: u64,
}

impl CreditBudget {
    pub fn new(remaining: u64) -> Self {
        Self { remaining }
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}
