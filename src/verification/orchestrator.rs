//! Sequential, credit-aware bulk verification.
//!
//! One address is in flight at a time. That keeps results in input order, lets
//! the credit balance reported by each response gate the next call, and gives
//! progress at per-address granularity.

use crate::core::config::{random_duration_in, Config};
use crate::core::error::{AppError, Result};
use crate::core::models::{BatchSummary, RowIndex, VerificationResult};
use crate::utils::address::has_valid_shape;
use crate::verification::classifier::{classify, RiskLevel};
use crate::verification::retry::RetryPolicy;
use crate::verification::service::VerificationService;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::sleep;

/// Shared stop switch, checked before each address is submitted.
///
/// Cancelling never interrupts a call already in flight.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Caller-owned result store for a batch run.
///
/// Results are kept in submission order and the bucket summary is updated with
/// every append, so it always equals `summarize(results())`.
#[derive(Debug, Clone, Default)]
pub struct BatchAccumulator {
    results: Vec<VerificationResult>,
    summary: BatchSummary,
}

impl BatchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: VerificationResult) {
        self.summary.record(&result);
        self.results.push(result);
    }

    pub fn results(&self) -> &[VerificationResult] {
        &self.results
    }

    pub fn summary(&self) -> BatchSummary {
        self.summary
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn into_results(self) -> Vec<VerificationResult> {
        self.results
    }
}

/// Snapshot delivered to the observer after every processed address.
#[derive(Debug)]
pub struct ProgressUpdate<'a> {
    pub done: usize,
    pub total: usize,
    pub latest: &'a VerificationResult,
    pub risk: RiskLevel,
    pub summary: BatchSummary,
    pub remaining_credits: u64,
}

/// Receives the decisions and progress of a batch run.
pub trait BatchObserver {
    /// Asked when more addresses were supplied than the balance covers.
    /// Returning `true` verifies only the first `affordable` addresses.
    fn confirm_partial_run(&mut self, requested: usize, affordable: u64) -> bool;

    fn on_batch_start(&mut self, _total: usize, _remaining_credits: u64) {}

    fn on_progress(&mut self, _update: &ProgressUpdate<'_>) {}

    /// Fired at most once per run, when the balance first drops to the low-credit threshold.
    fn on_low_credits(&mut self, _remaining_credits: u64) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every planned address was processed.
    Completed,
    /// The caller refused a run truncated to the available credits.
    Declined,
    /// The cancellation flag was raised.
    Cancelled,
    /// The reported balance reached zero before the list was exhausted.
    CreditsExhausted,
    /// The server refused a call for lack of credits.
    InsufficientCredits,
}

impl StopReason {
    /// True when the run ended because credits ran out.
    pub fn is_budget_stop(&self) -> bool {
        matches!(
            self,
            StopReason::CreditsExhausted | StopReason::InsufficientCredits
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub stop_reason: StopReason,
    /// Addresses planned for submission after filtering and truncation.
    pub planned: usize,
    /// Addresses dropped by the shape check.
    pub excluded: usize,
    /// Addresses that produced a result in this run.
    pub processed: usize,
    pub remaining_credits: u64,
    pub summary: BatchSummary,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome {
    pub results: Vec<VerificationResult>,
    pub report: BatchReport,
}

impl BatchOutcome {
    pub fn summary(&self) -> BatchSummary {
        self.report.summary
    }
}

pub struct BatchOrchestrator<S> {
    service: S,
    retry: RetryPolicy,
    pacing: (f32, f32),
    low_credit_threshold: u64,
    cancel: CancellationFlag,
}

impl<S: VerificationService> BatchOrchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            retry: RetryPolicy::default(),
            pacing: (0.0, 0.0),
            low_credit_threshold: 10,
            cancel: CancellationFlag::new(),
        }
    }

    pub fn from_config(service: S, config: &Config) -> Self {
        Self::new(service)
            .with_retry_policy(config.retry_policy())
            .with_pacing(config.sleep_between_requests)
            .with_low_credit_threshold(config.low_credit_threshold)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Random pause, in seconds, between two consecutive verification calls.
    pub fn with_pacing(mut self, range: (f32, f32)) -> Self {
        self.pacing = range;
        self
    }

    pub fn with_low_credit_threshold(mut self, threshold: u64) -> Self {
        self.low_credit_threshold = threshold;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationFlag {
        self.cancel.clone()
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Runs a batch into a fresh accumulator and returns its results.
    pub async fn run_batch<O>(
        &self,
        addresses: &[String],
        rows: Option<&RowIndex>,
        observer: &mut O,
    ) -> Result<BatchOutcome>
    where
        O: BatchObserver + ?Sized,
    {
        let mut accumulator = BatchAccumulator::new();
        let report = self
            .run_batch_into(addresses, rows, &mut accumulator, observer)
            .await?;
        Ok(BatchOutcome {
            results: accumulator.into_results(),
            report,
        })
    }

    /// Verifies `addresses` one at a time, appending to `accumulator`.
    ///
    /// Addresses failing the shape check are dropped before anything is sent.
    /// Fails without verifying anything when no address survives the check,
    /// when the balance cannot be fetched, or when it is already zero. Once
    /// verification has started, every stop condition returns the results
    /// collected so far.
    pub async fn run_batch_into<O>(
        &self,
        addresses: &[String],
        rows: Option<&RowIndex>,
        accumulator: &mut BatchAccumulator,
        observer: &mut O,
    ) -> Result<BatchReport>
    where
        O: BatchObserver + ?Sized,
    {
        let mut eligible: Vec<&str> = addresses
            .iter()
            .map(|a| a.trim())
            .filter(|a| has_valid_shape(a))
            .collect();
        let excluded = addresses.len() - eligible.len();
        if excluded > 0 {
            tracing::debug!(
                target: "orchestrator",
                "Excluded {} malformed address(es) before submission",
                excluded
            );
        }
        if eligible.is_empty() {
            return Err(AppError::InsufficientInput(
                "No well-formed email addresses to verify".to_string(),
            ));
        }

        let budget = self.service.check_credits().await.map_err(|e| {
            tracing::error!(target: "orchestrator", "Credit check failed: {}", e);
            AppError::CreditCheckUnavailable(e.to_string())
        })?;
        if budget.is_exhausted() {
            tracing::warn!(target: "orchestrator", "No credits available, batch not started");
            return Err(AppError::NoCredits);
        }
        let mut remaining = budget.remaining;

        let requested = eligible.len();
        if requested as u64 > remaining {
            if !observer.confirm_partial_run(requested, remaining) {
                tracing::info!(
                    target: "orchestrator",
                    "Partial run of {} of {} addresses declined",
                    remaining,
                    requested
                );
                return Ok(BatchReport {
                    stop_reason: StopReason::Declined,
                    planned: 0,
                    excluded,
                    processed: 0,
                    remaining_credits: remaining,
                    summary: accumulator.summary(),
                });
            }
            // remaining < requested, so it fits in usize.
            eligible.truncate(remaining as usize);
        }

        let total = eligible.len();
        let started = Instant::now();
        tracing::info!(
            target: "orchestrator",
            "Verifying {} address(es) with {} credit(s) available",
            total,
            remaining
        );
        observer.on_batch_start(total, remaining);

        let mut done = 0;
        let mut low_credit_warned = false;
        let mut stop_reason = StopReason::Completed;

        for (index, email) in eligible.into_iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::info!(target: "orchestrator", "Cancelled after {} of {}", done, total);
                stop_reason = StopReason::Cancelled;
                break;
            }
            if remaining == 0 {
                tracing::warn!(target: "orchestrator", "Credits exhausted after {} of {}", done, total);
                stop_reason = StopReason::CreditsExhausted;
                break;
            }
            if index > 0 {
                let pause = random_duration_in(self.pacing);
                if !pause.is_zero() {
                    sleep(pause).await;
                }
            }

            let label = format!("[{}/{} {}]", index + 1, total, email);
            let mut result = match self
                .retry
                .run(&label, || self.service.check_email(email))
                .await
            {
                Ok(outcome) => {
                    if let Some(reported) = outcome.remaining_credits {
                        remaining = reported;
                    }
                    outcome.result
                }
                Err(e) if e.is_credit_exhaustion() => {
                    tracing::warn!(target: "orchestrator", "{} Server refused for lack of credits: {}", label, e);
                    remaining = match e {
                        AppError::InsufficientCredits {
                            current_credits, ..
                        } => current_credits.unwrap_or(0),
                        _ => 0,
                    };
                    stop_reason = StopReason::InsufficientCredits;
                    break;
                }
                Err(e) => {
                    tracing::warn!(target: "orchestrator", "{} Recording error result: {}", label, e);
                    VerificationResult::failed(email, e.to_string())
                }
            };

            if let Some(row) = rows.and_then(|lookup| lookup.get(email)) {
                result.original_row = Some(row.clone());
            }
            let risk = classify(&result);
            tracing::debug!(
                target: "orchestrator",
                "{} status={} risk={} remaining={}",
                label,
                result.status,
                risk,
                remaining
            );
            accumulator.push(result);
            done += 1;

            if !low_credit_warned && remaining > 0 && remaining <= self.low_credit_threshold {
                low_credit_warned = true;
                observer.on_low_credits(remaining);
            }
            if let Some(latest) = accumulator.results().last() {
                observer.on_progress(&ProgressUpdate {
                    done,
                    total,
                    latest,
                    risk,
                    summary: accumulator.summary(),
                    remaining_credits: remaining,
                });
            }
        }

        let summary = accumulator.summary();
        tracing::info!(
            target: "orchestrator",
            "Batch finished ({:?}) in {:.2?}: {} processed, {} valid, {} catch-all, {} invalid, {} credit(s) left",
            stop_reason,
            started.elapsed(),
            done,
            summary.valid,
            summary.catch_all,
            summary.invalid,
            remaining
        );

        Ok(BatchReport {
            stop_reason,
            planned: total,
            excluded,
            processed: done,
            remaining_credits: remaining,
            summary,
        })
    }
}
