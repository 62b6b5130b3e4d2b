//! Terminal front-end for a batch run: prompts, progress bar and warnings.

use bulk_verify_core::verification::{BatchObserver, ProgressUpdate};
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};

pub struct TerminalObserver {
    assume_yes: bool,
    progress: Option<ProgressBar>,
}

impl TerminalObserver {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            progress: None,
        }
    }

    pub fn finish(&mut self) {
        if let Some(progress) = self.progress.take() {
            progress.finish_and_clear();
        }
    }

    fn print(&self, message: &str) {
        match &self.progress {
            Some(progress) => progress.println(message),
            None => eprintln!("{}", message),
        }
    }
}

/// Asks a yes/no question on the terminal. Defaults to "no" if the prompt fails.
pub fn confirm(prompt: &str, assume_yes: bool) -> bool {
    if assume_yes {
        return true;
    }
    Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .unwrap_or_else(|e| {
            tracing::warn!("Could not read confirmation ({}), assuming no", e);
            false
        })
}

impl BatchObserver for TerminalObserver {
    fn confirm_partial_run(&mut self, requested: usize, affordable: u64) -> bool {
        let prompt = format!(
            "You have {} credits but want to check {} emails. Only {} emails will be checked. Continue?",
            affordable, requested, affordable
        );
        confirm(&prompt, self.assume_yes)
    }

    fn on_batch_start(&mut self, total: usize, _remaining_credits: u64) {
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        let progress = ProgressBar::new(total as u64);
        progress.set_style(style);
        self.progress = Some(progress);
    }

    fn on_progress(&mut self, update: &ProgressUpdate<'_>) {
        if let Some(progress) = &self.progress {
            progress.set_position(update.done as u64);
            progress.set_message(format!(
                "{} {} ({}) | {} credits left",
                update.latest.email, update.latest.status, update.risk, update.remaining_credits
            ));
        }
    }

    fn on_low_credits(&mut self, remaining_credits: u64) {
        self.print(&format!(
            "Low credit warning: you have {} credits remaining. Consider purchasing more credits to continue verification.",
            remaining_credits
        ));
    }
}
