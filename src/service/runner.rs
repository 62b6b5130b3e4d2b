//! Drives the `verify` and `credits` commands.

use crate::cli::{export_filters, VerifyArgs};
use crate::service::observer::{confirm, TerminalObserver};
use anyhow::{bail, Context};
use bulk_verify_core::io::export::{default_file_name, filter_results, ExportFormat, ExportTable};
use bulk_verify_core::io::input::InputBatch;
use bulk_verify_core::verification::{
    batch_title, classify, persist_batch, BatchOrchestrator, BatchOutcome, BatchSource,
    PersistenceStatus, StopReason, VerificationService,
};
use bulk_verify_core::{
    AppError, CancellationFlag, Config, HttpVerificationService, VerificationResult,
};
use prettytable::{Cell, Row, Table};
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Reads every input source given on the command line into one batch.
fn collect_input(args: &VerifyArgs) -> anyhow::Result<(InputBatch, Option<String>)> {
    let mut batch = InputBatch::from_addresses(&args.emails);
    let mut file_name = None;

    if let Some(path) = &args.text_file {
        let text = InputBatch::load_text_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        batch.merge(text);
        file_name = Some(display_name(path));
    }
    if let Some(path) = &args.csv_file {
        let csv = InputBatch::load_csv_file(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        batch.merge(csv);
        file_name = Some(display_name(path));
    }
    Ok((batch, file_name))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn run_verify(config: &Config, args: VerifyArgs) -> anyhow::Result<()> {
    let (input, file_name) = collect_input(&args)?;
    if input.is_empty() {
        bail!("Please provide at least one valid email address");
    }

    let total = input.emails.len();
    if total > config.large_batch_threshold {
        let prompt = format!(
            "You're about to check {} emails. This may take a while. Continue?",
            total
        );
        if !confirm(&prompt, args.yes) {
            tracing::info!("Batch of {} cancelled before start", total);
            return Ok(());
        }
    }

    let service = HttpVerificationService::new(config)?;
    let orchestrator = BatchOrchestrator::from_config(service, config);

    let cancel = orchestrator.cancellation();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, cancel).await {
            eprintln!("Aborted.");
            std::process::exit(130);
        }
    });

    let rows = input.row_index();
    let mut observer = TerminalObserver::new(args.yes);
    let run = orchestrator
        .run_batch(&input.emails, Some(&rows), &mut observer)
        .await;
    observer.finish();

    let outcome = match run {
        Ok(outcome) => outcome,
        Err(AppError::NoCredits) => {
            bail!("Your credits are 0. Please purchase more credits to continue email verification.")
        }
        Err(AppError::CreditCheckUnavailable(reason)) => {
            bail!("Unable to check credits ({}). Please try again later.", reason)
        }
        Err(e) => return Err(e.into()),
    };

    report_stop(&outcome);
    if outcome.results.is_empty() {
        if args.json {
            println!("[]");
        }
        return Ok(());
    }
    write_results(&mut std::io::stdout().lock(), &outcome, args.json)?;
    if args.json {
        eprintln!("{}", summary_line(&outcome));
    }

    if config.save_history && !args.no_history {
        let source = match (&file_name, input.emails.len()) {
            (Some(name), _) => BatchSource::File { name },
            (None, 1) => BatchSource::Single,
            (None, _) => BatchSource::Multiple,
        };
        let title = args
            .title
            .clone()
            .unwrap_or_else(|| batch_title(source, &input.emails));
        match persist_batch(orchestrator.service(), &title, &outcome.results).await {
            PersistenceStatus::Saved { history_id, .. } => match history_id {
                Some(id) => eprintln!("Saved to history as '{}' (#{})", title, id),
                None => eprintln!("Saved to history as '{}'", title),
            },
            PersistenceStatus::Failed(reason) => {
                eprintln!("Results were not saved to history: {}", reason)
            }
            PersistenceStatus::Skipped => {}
        }
    }

    if let Some(target) = &args.export {
        let format = ExportFormat::from(args.format);
        let path = export_path(target, format);
        let kept = filter_results(&outcome.results, &export_filters(&args.only));
        let table = ExportTable::build(&kept, &input.headers);
        table.write_to(&path, format)?;
        eprintln!("Exported {} row(s) to {}", table.rows.len(), path.display());
    }
    Ok(())
}

/// Waits for interrupts. The first raises `cancel` so the batch stops after the
/// address in flight; a second returns `true` and the caller exits at once.
async fn watch_interrupts<F, Fut>(mut next_interrupt: F, cancel: CancellationFlag) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    if next_interrupt().await.is_err() {
        return false;
    }
    eprintln!("Stop requested, finishing the current address (Ctrl-C again to abort)...");
    cancel.cancel();
    next_interrupt().await.is_ok()
}

fn export_path(target: &Path, format: ExportFormat) -> PathBuf {
    if target.is_dir() {
        target.join(default_file_name(format, chrono::Local::now().date_naive()))
    } else {
        target.to_path_buf()
    }
}

fn report_stop(outcome: &BatchOutcome) {
    let report = &outcome.report;
    match report.stop_reason {
        StopReason::Completed => {}
        StopReason::Declined => eprintln!("Verification cancelled, no credits were used."),
        StopReason::Cancelled => eprintln!(
            "Verification stopped after {} of {} emails.",
            report.processed, report.planned
        ),
        StopReason::CreditsExhausted | StopReason::InsufficientCredits => eprintln!(
            "Your credits are 0. Email verification has been stopped after {} of {} emails.",
            report.processed, report.planned
        ),
    }
    if report.excluded > 0 {
        eprintln!("Skipped {} malformed address(es).", report.excluded);
    }
}

fn results_table(results: &[VerificationResult]) -> Table {
    let mut table = Table::new();
    table.set_titles(Row::new(vec![
        Cell::new("Email").style_spec("bFg"),
        Cell::new("Status").style_spec("bFg"),
        Cell::new("Catch-All").style_spec("bFg"),
        Cell::new("Score").style_spec("bFg"),
        Cell::new("Risk").style_spec("bFg"),
    ]));
    for result in results {
        let score = result
            .score
            .map(|s| format!("{:.0}", s * 100.0))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(Row::new(vec![
            Cell::new(&result.email),
            Cell::new(result.status.as_str()),
            Cell::new(if result.is_catch_all { "Yes" } else { "No" }),
            Cell::new(&score).style_spec("r"),
            Cell::new(classify(result).as_str()),
        ]));
    }
    table
}

fn summary_line(outcome: &BatchOutcome) -> String {
    let summary = outcome.summary();
    format!(
        "Total: {}  Valid: {}  Catch-All: {}  Invalid: {}  Success rate: {}%  Remaining credits: {}",
        summary.total,
        summary.valid,
        summary.catch_all,
        summary.invalid,
        summary.success_rate(),
        outcome.report.remaining_credits
    )
}

/// Writes the batch results to `out`: only the JSON array when `json` is set,
/// the results table and summary otherwise.
fn write_results<W: Write>(out: &mut W, outcome: &BatchOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        serde_json::to_writer_pretty(&mut *out, &outcome.results)?;
        writeln!(out)?;
        return Ok(());
    }
    results_table(&outcome.results).print(out)?;
    writeln!(out)?;
    writeln!(out, "{}", summary_line(outcome))?;
    Ok(())
}

pub async fn show_credits(config: &Config) -> anyhow::Result<()> {
    let service = HttpVerificationService::new(config)?;
    let budget = service
        .check_credits()
        .await
        .context("Unable to check credits")?;
    println!("{}", budget.remaining);
    if budget.is_exhausted() {
        eprintln!("Your credits are 0. Please purchase more credits to continue email verification.");
    } else if budget.remaining <= config.low_credit_threshold {
        eprintln!(
            "You have {} credits remaining. Consider purchasing more credits for uninterrupted email verification.",
            budget.remaining
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bulk_verify_core::verification::BatchReport;
    use bulk_verify_core::{summarize, VerificationStatus};
    use std::cell::Cell as Counter;

    fn outcome() -> BatchOutcome {
        let valid = VerificationResult {
            status: VerificationStatus::Valid,
            reason: None,
            score: Some(0.92),
            spf: Some("v=spf1 -all".to_string()),
            ..VerificationResult::failed("jane@acme.com", "")
        };
        let failed = VerificationResult::failed("sam@globex.io", "HTTP 503");
        let results = vec![valid, failed];
        let summary = summarize(&results);
        BatchOutcome {
            report: BatchReport {
                stop_reason: StopReason::Completed,
                planned: 2,
                excluded: 0,
                processed: 2,
                remaining_credits: 48,
                summary,
            },
            results,
        }
    }

    #[test]
    fn json_output_is_only_json() {
        let outcome = outcome();
        let mut out = Vec::new();
        write_results(&mut out, &outcome, true).unwrap();

        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let rows = parsed.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["email"], "jane@acme.com");
        assert_eq!(rows[1]["status"], "error");
    }

    #[test]
    fn table_output_lists_every_result() {
        let outcome = outcome();
        let mut out = Vec::new();
        write_results(&mut out, &outcome, false).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Email") && text.contains("Risk"));
        assert!(text.contains("jane@acme.com") && text.contains("safe"));
        assert!(text.contains("sam@globex.io") && text.contains("high"));
        assert!(text.contains("Remaining credits: 48"));
        assert!(serde_json::from_str::<serde_json::Value>(&text).is_err());
    }

    #[tokio::test]
    async fn second_interrupt_aborts() {
        let cancel = CancellationFlag::new();
        let seen = Counter::new(0);
        let abort = watch_interrupts(
            || {
                seen.set(seen.get() + 1);
                std::future::ready(Ok(()))
            },
            cancel.clone(),
        )
        .await;
        assert!(abort);
        assert!(cancel.is_cancelled());
        assert_eq!(seen.get(), 2);
    }

    #[tokio::test]
    async fn failed_signal_registration_changes_nothing() {
        let cancel = CancellationFlag::new();
        let abort = watch_interrupts(
            || std::future::ready(Err(std::io::Error::new(std::io::ErrorKind::Other, "no signal handler"))),
            cancel.clone(),
        )
        .await;
        assert!(!abort);
        assert!(!cancel.is_cancelled());
    }
}
