#![allow(dead_code)]

use async_trait::async_trait;
use bulk_verify_core::verification::{
    BatchObserver, CancellationFlag, CheckOutcome, HistorySummary, ProgressUpdate,
    SaveBatchRequest, SavedBatch, VerificationService,
};
use bulk_verify_core::{AppError, CreditBudget, Result, VerificationResult, VerificationStatus};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// What the mock does for one call to `check_email`.
#[derive(Debug, Clone)]
pub enum Reply {
    Result(VerificationResult),
    Transient,
    Refuse,
}

pub fn valid(email: &str, score: f64) -> VerificationResult {
    VerificationResult {
        status: VerificationStatus::Valid,
        reason: None,
        score: Some(score),
        spf: Some("v=spf1 mx -all".to_string()),
        ..VerificationResult::failed(email, "")
    }
}

/// In-memory verification service charging one credit per successful check.
pub struct MockService {
    /// Balance reported by `check_credits`; `None` makes the check fail.
    advertised: Option<u64>,
    balance: Mutex<u64>,
    replies: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    saved: Mutex<Vec<SaveBatchRequest>>,
    fail_saves: bool,
}

impl MockService {
    pub fn with_credits(credits: u64) -> Self {
        Self::advertising(Some(credits), credits)
    }

    /// `check_credits` reports `advertised` while calls are charged against `balance`.
    pub fn advertising(advertised: Option<u64>, balance: u64) -> Self {
        Self {
            advertised,
            balance: Mutex::new(balance),
            replies: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            saved: Mutex::new(Vec::new()),
            fail_saves: false,
        }
    }

    pub fn failing_saves(mut self) -> Self {
        self.fail_saves = true;
        self
    }

    pub fn script(self, email: &str, replies: Vec<Reply>) -> Self {
        self.replies
            .lock()
            .insert(email.to_string(), replies.into_iter().collect());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn saved(&self) -> Vec<SaveBatchRequest> {
        self.saved.lock().clone()
    }
}

#[async_trait]
impl VerificationService for MockService {
    async fn check_email(&self, email: &str) -> Result<CheckOutcome> {
        self.calls.lock().push(email.to_string());
        let reply = self
            .replies
            .lock()
            .get_mut(email)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Reply::Result(valid(email, 0.9)));

        let mut balance = self.balance.lock();
        match reply {
            Reply::Refuse => Err(AppError::InsufficientCredits {
                message: "You need at least 1 verify credit".to_string(),
                current_credits: Some(0),
            }),
            _ if *balance == 0 => Err(AppError::InsufficientCredits {
                message: "You need at least 1 verify credit".to_string(),
                current_credits: Some(0),
            }),
            Reply::Transient => Err(AppError::Service {
                status: 503,
                message: "upstream timeout".to_string(),
            }),
            Reply::Result(result) => {
                *balance -= 1;
                Ok(CheckOutcome {
                    result,
                    remaining_credits: Some(*balance),
                })
            }
        }
    }

    async fn check_credits(&self) -> Result<CreditBudget> {
        self.advertised
            .map(CreditBudget::new)
            .ok_or_else(|| AppError::Service {
                status: 502,
                message: "bad gateway".to_string(),
            })
    }

    async fn save_batch(&self, request: &SaveBatchRequest) -> Result<SavedBatch> {
        if self.fail_saves {
            return Err(AppError::Service {
                status: 500,
                message: "Batch verification failed".to_string(),
            });
        }
        self.saved.lock().push(request.clone());
        Ok(SavedBatch {
            history_id: Some(self.saved.lock().len() as i64),
            summary: HistorySummary {
                total: request.emails.len(),
                valid: request.emails.len(),
                invalid: 0,
                catch_all: 0,
                success_rate: 100.0,
            },
        })
    }
}

/// Observer that records everything it is told.
#[derive(Default)]
pub struct Recorder {
    pub accept_partial: bool,
    pub prompts: Vec<(usize, u64)>,
    pub started: Option<(usize, u64)>,
    pub progress: Vec<(usize, usize, String, u64)>,
    pub summary_totals: Vec<usize>,
    pub low_credit_warnings: Vec<u64>,
    /// Raise this flag once `done` reaches the given count.
    pub cancel_after: Option<(usize, CancellationFlag)>,
}

impl Recorder {
    pub fn accepting() -> Self {
        Self {
            accept_partial: true,
            ..Self::default()
        }
    }
}

impl BatchObserver for Recorder {
    fn confirm_partial_run(&mut self, requested: usize, affordable: u64) -> bool {
        self.prompts.push((requested, affordable));
        self.accept_partial
    }

    fn on_batch_start(&mut self, total: usize, remaining_credits: u64) {
        self.started = Some((total, remaining_credits));
    }

    fn on_progress(&mut self, update: &ProgressUpdate<'_>) {
        self.progress.push((
            update.done,
            update.total,
            update.latest.email.clone(),
            update.remaining_credits,
        ));
        self.summary_totals.push(update.summary.total);
        if let Some((after, flag)) = &self.cancel_after {
            if update.done >= *after {
                flag.cancel();
            }
        }
    }

    fn on_low_credits(&mut self, remaining_credits: u64) {
        self.low_credit_warnings.push(remaining_credits);
    }
}

pub fn addresses(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
