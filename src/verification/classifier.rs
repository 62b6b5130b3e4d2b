//! Risk tiers and outcome buckets derived from verification results.
//!
//! Two independent partitions live here. [`classify`] assigns a risk tier used
//! for display and export filtering; [`summarize`] counts outcome buckets with
//! catch-all taking precedence over a bare `valid` status. They answer
//! different questions and must not be substituted for one another.

use crate::core::models::{BatchSummary, VerificationResult, VerificationStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

const SAFE_SCORE: f64 = 0.7;
const HIGH_RISK_SCORE: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome bucket used by [`BatchSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeBucket {
    Valid,
    CatchAll,
    Invalid,
}

/// Maps one result to its risk tier. First matching rule wins:
///
/// 1. `Safe`: deliverable status, not disposable, not blacklisted, not
///    role-based, score >= 0.7 and at least one SPF/DKIM/DMARC record.
/// 2. `High`: undeliverable status, blacklisted, disposable, or score < 0.4.
/// 3. `Medium`: everything else.
///
/// A missing score is never safe and never trips the low-score rule, so such
/// results are judged on status and flags alone.
pub fn classify(result: &VerificationResult) -> RiskLevel {
    let deliverable = result.status.is_deliverable();
    let good_score = result.score.is_some_and(|s| s >= SAFE_SCORE);
    let poor_score = result.score.is_some_and(|s| s < HIGH_RISK_SCORE);

    if deliverable
        && !result.is_disposable
        && !result.is_blacklisted
        && !result.is_role_based
        && good_score
        && result.has_auth_record()
    {
        return RiskLevel::Safe;
    }

    if !deliverable || result.is_blacklisted || result.is_disposable || poor_score {
        return RiskLevel::High;
    }

    RiskLevel::Medium
}

/// Catch-all flag or status first, then `valid`, everything else is invalid.
pub fn bucket_of(result: &VerificationResult) -> OutcomeBucket {
    if result.is_catch_all || result.status == VerificationStatus::CatchAll {
        OutcomeBucket::CatchAll
    } else if result.status == VerificationStatus::Valid {
        OutcomeBucket::Valid
    } else {
        OutcomeBucket::Invalid
    }
}

impl BatchSummary {
    /// Adds one result to the running counts.
    pub fn record(&mut self, result: &VerificationResult) {
        self.total += 1;
        match bucket_of(result) {
            OutcomeBucket::Valid => self.valid += 1,
            OutcomeBucket::CatchAll => self.catch_all += 1,
            OutcomeBucket::Invalid => self.invalid += 1,
        }
    }
}

/// Recomputes the bucket counts for a whole result set.
pub fn summarize<'a, I>(results: I) -> BatchSummary
where
    I: IntoIterator<Item = &'a VerificationResult>,
{
    results
        .into_iter()
        .fold(BatchSummary::default(), |mut summary, result| {
            summary.record(result);
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: VerificationStatus, score: Option<f64>) -> VerificationResult {
        VerificationResult {
            status,
            score,
            reason: None,
            spf: Some("v=spf1 -all".to_string()),
            ..VerificationResult::failed("someone@example.com", "")
        }
    }

    #[test]
    fn clean_valid_result_is_safe() {
        let r = result(VerificationStatus::Valid, Some(0.9));
        assert_eq!(classify(&r), RiskLevel::Safe);

        let deliverable = result(VerificationStatus::Deliverable, Some(0.7));
        assert_eq!(classify(&deliverable), RiskLevel::Safe);
    }

    #[test]
    fn catch_all_valid_is_safe_but_buckets_as_catch_all() {
        let mut r = result(VerificationStatus::Valid, Some(0.9));
        r.is_catch_all = true;
        assert_eq!(classify(&r), RiskLevel::Safe);
        assert_eq!(bucket_of(&r), OutcomeBucket::CatchAll);

        r.spf = None;
        assert_eq!(classify(&r), RiskLevel::Medium);

        r.spf = Some("v=spf1 -all".into());
        r.is_role_based = true;
        assert_eq!(classify(&r), RiskLevel::Medium);

        r.is_disposable = true;
        assert_eq!(classify(&r), RiskLevel::High);
    }

    #[test]
    fn invalid_low_score_is_high() {
        let r = result(VerificationStatus::Invalid, Some(0.2));
        assert_eq!(classify(&r), RiskLevel::High);
        assert_eq!(bucket_of(&r), OutcomeBucket::Invalid);
    }

    #[test]
    fn score_bands() {
        assert_eq!(
            classify(&result(VerificationStatus::Valid, Some(0.5))),
            RiskLevel::Medium
        );
        assert_eq!(
            classify(&result(VerificationStatus::Valid, Some(0.39))),
            RiskLevel::High
        );
        assert_eq!(
            classify(&result(VerificationStatus::Valid, Some(0.4))),
            RiskLevel::Medium
        );
    }

    #[test]
    fn missing_score_falls_back_to_signals() {
        assert_eq!(
            classify(&result(VerificationStatus::Valid, None)),
            RiskLevel::Medium
        );
        assert_eq!(
            classify(&result(VerificationStatus::Error, None)),
            RiskLevel::High
        );
        let mut blacklisted = result(VerificationStatus::Valid, None);
        blacklisted.is_blacklisted = true;
        assert_eq!(classify(&blacklisted), RiskLevel::High);
    }

    #[test]
    fn classify_is_deterministic() {
        let r = result(VerificationStatus::CatchAll, Some(0.55));
        assert_eq!(classify(&r), classify(&r));
        assert_eq!(classify(&r), RiskLevel::High);
    }

    #[test]
    fn summary_counts_every_result_once() {
        let mut catch_all_flag = result(VerificationStatus::Valid, Some(0.9));
        catch_all_flag.is_catch_all = true;
        let results = vec![
            result(VerificationStatus::Valid, Some(0.9)),
            catch_all_flag,
            result(VerificationStatus::CatchAll, Some(0.5)),
            result(VerificationStatus::Invalid, Some(0.0)),
            result(VerificationStatus::Error, Some(0.0)),
            result(VerificationStatus::Deliverable, Some(0.8)),
            result(VerificationStatus::Unknown("risky".into()), None),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.total, results.len());
        assert_eq!(summary.valid, 1);
        assert_eq!(summary.catch_all, 2);
        assert_eq!(summary.invalid, 4);
        assert_eq!(
            summary.total,
            summary.valid + summary.catch_all + summary.invalid
        );
        assert_eq!(summarize(std::iter::empty()), BatchSummary::default());
    }
}
