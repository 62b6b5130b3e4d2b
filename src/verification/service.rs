//! The contract the orchestrator needs from a remote verification backend.

use crate::core::error::Result;
use crate::core::models::{CreditBudget, VerificationResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A verification result together with the credit count the server reported with it.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub result: VerificationResult,
    pub remaining_credits: Option<u64>,
}

/// Body of the history-persistence call for a finished batch.
#[derive(Debug, Clone, Serialize)]
pub struct SaveBatchRequest {
    pub emails: Vec<String>,
    pub title: String,
    pub precomputed_results: Vec<VerificationResult>,
}

/// Summary the history store computed for a saved batch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistorySummary {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    #[serde(rename = "catchall", alias = "catch_all")]
    pub catch_all: usize,
    #[serde(default)]
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedBatch {
    #[serde(default)]
    pub history_id: Option<i64>,
    pub summary: HistorySummary,
}

/// Remote verification backend.
///
/// Credits are metered server-side: each successful `check_email` costs one
/// credit, and a refusal for lack of credits surfaces as
/// [`AppError::InsufficientCredits`](crate::core::error::AppError::InsufficientCredits).
#[async_trait]
pub trait VerificationService: Send + Sync {
    /// Verifies a single address.
    async fn check_email(&self, email: &str) -> Result<CheckOutcome>;

    /// Fetches the current credit balance.
    async fn check_credits(&self) -> Result<CreditBudget>;

    /// Stores a completed batch in the account's verification history.
    async fn save_batch(&self, request: &SaveBatchRequest) -> Result<SavedBatch>;
}
