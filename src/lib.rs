//! Core library for bulk-verify: credit-aware bulk email verification against
//! a remote verification service, risk classification of the results, and
//! export of the outcome.

pub mod core;
pub mod io;
pub mod utils;
pub mod verification;

pub use crate::core::config::{Config, ConfigBuilder};
pub use crate::core::error::{AppError, Result};
pub use crate::core::models::{
    BatchSummary, CreditBudget, OriginalRow, RowIndex, VerificationResult, VerificationStatus,
};
pub use crate::io::export::{ExportFilters, ExportFormat, ExportTable};
pub use crate::io::input::InputBatch;
pub use crate::verification::{
    classify, summarize, BatchObserver, BatchOrchestrator, BatchOutcome, BatchReport,
    CancellationFlag, HttpVerificationService, PersistenceStatus, RetryPolicy, RiskLevel,
    StopReason, VerificationService,
};
