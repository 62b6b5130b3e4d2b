//! Batch verification against the remote service: orchestration, retry,
//! risk classification and history persistence.

pub mod classifier;
pub mod history;
pub mod http;
pub mod orchestrator;
pub mod retry;
pub mod service;

pub use classifier::{bucket_of, classify, summarize, OutcomeBucket, RiskLevel};
pub use history::{batch_title, persist_batch, BatchSource, PersistenceStatus};
pub use http::HttpVerificationService;
pub use orchestrator::{
    BatchAccumulator, BatchObserver, BatchOrchestrator, BatchOutcome, BatchReport,
    CancellationFlag, ProgressUpdate, StopReason,
};
pub use retry::RetryPolicy;
pub use service::{CheckOutcome, HistorySummary, SaveBatchRequest, SavedBatch, VerificationService};
