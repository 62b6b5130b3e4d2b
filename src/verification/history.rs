//! Saving finished batches to the account's verification history.
//!
//! Persistence is best-effort. A failed save is logged and reported as a
//! [`PersistenceStatus`], never as a verification failure.

use crate::core::models::VerificationResult;
use crate::verification::service::{HistorySummary, SaveBatchRequest, VerificationService};

/// Where the addresses of a batch came from, used to title the history entry.
#[derive(Debug, Clone, Copy)]
pub enum BatchSource<'a> {
    Single,
    Multiple,
    File { name: &'a str },
}

/// Builds the history title for a batch.
pub fn batch_title(source: BatchSource<'_>, emails: &[String]) -> String {
    match source {
        BatchSource::Single => match emails.first() {
            Some(email) => format!("Single Email - {}", email),
            None => "Email Verification".to_string(),
        },
        BatchSource::Multiple => format!("Multiple Emails - {} emails", emails.len()),
        BatchSource::File { name } => format!("File Upload - {}", name),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceStatus {
    Saved {
        history_id: Option<i64>,
        summary: HistorySummary,
    },
    /// Nothing was verified, so nothing was sent.
    Skipped,
    Failed(String),
}

/// Sends the results of a batch to the history store.
pub async fn persist_batch<S>(
    service: &S,
    title: &str,
    results: &[VerificationResult],
) -> PersistenceStatus
where
    S: VerificationService + ?Sized,
{
    if results.is_empty() {
        tracing::debug!(target: "orchestrator", "No results, skipping history save");
        return PersistenceStatus::Skipped;
    }

    let request = SaveBatchRequest {
        emails: results.iter().map(|r| r.email.clone()).collect(),
        title: title.to_string(),
        precomputed_results: results.to_vec(),
    };

    match service.save_batch(&request).await {
        Ok(saved) => {
            tracing::info!(
                target: "orchestrator",
                "Saved '{}' to history (id {:?}, {} emails)",
                title,
                saved.history_id,
                saved.summary.total
            );
            PersistenceStatus::Saved {
                history_id: saved.history_id,
                summary: saved.summary,
            }
        }
        Err(e) => {
            tracing::warn!(target: "orchestrator", "Failed to save batch '{}' to history: {}", title, e);
            PersistenceStatus::Failed(e.to_string())
        }
    }
}
