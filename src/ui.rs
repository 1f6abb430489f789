// UI layer: the production confirmation prompt and the per-row console
// report. Prompting goes through the `Prompt` trait so the flow can be driven
// without a terminal.

use crate::importer::{self, ImportSummary, RowOutcome};
use crate::settings::Settings;
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::Input;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

/// Placeholder used when a failed row has no readable username.
pub const NO_USERNAME: &str = "No Username";

/// Source of answers to yes/no questions.
pub trait Prompt {
    fn ask(&mut self, question: &str) -> Result<String>;
}

/// Reads the answer from the terminal with `dialoguer`.
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &str) -> Result<String> {
        let answer: String = Input::new()
            .with_prompt(question)
            .allow_empty(true)
            .interact_text()
            .context("Failed to read confirmation")?;
        Ok(answer)
    }
}

/// `yes` or `y`, any case.
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("yes") || answer.eq_ignore_ascii_case("y")
}

/// Ask for confirmation when running against production. Other environments
/// proceed without asking.
pub fn confirm_environment(settings: &Settings, prompt: &mut dyn Prompt) -> Result<bool> {
    if !settings.is_production() {
        return Ok(true);
    }
    let answer = prompt.ask("⚠️  Running against PRODUCTION. Continue? (yes/no)")?;
    Ok(is_affirmative(&answer))
}

#[derive(Debug, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(ImportSummary),
    Declined,
}

/// Gate on confirmation, then run `import`. `import` is not called when the
/// user declines.
pub fn run<F>(settings: &Settings, prompt: &mut dyn Prompt, import: F) -> Result<RunOutcome>
where
    F: FnOnce(&Settings) -> Result<ImportSummary>,
{
    if !confirm_environment(settings, prompt)? {
        tracing::warn!(env = %settings.env, "Run declined at confirmation prompt");
        return Ok(RunOutcome::Declined);
    }
    Ok(RunOutcome::Completed(import(settings)?))
}

/// One console line per row.
pub fn format_outcome(outcome: &RowOutcome) -> String {
    let username = outcome.username.as_deref().unwrap_or(NO_USERNAME);
    match &outcome.result {
        Ok(payload) => format!("Successfully created user: {} -> {}", username, payload),
        Err(e) => format!("Failed to create user: {} -> {}", username, e),
    }
}

pub fn format_summary(summary: &ImportSummary) -> String {
    format!(
        "Processed {} rows: {} created, {} failed",
        summary.total(),
        summary.created,
        summary.failed
    )
}

/// Run the import for `path` with a spinner, printing each row's result.
pub fn import_with_progress(settings: &Settings, path: &Path) -> Result<ImportSummary> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message(format!("Importing users from {}...", path.display()));

    let result = importer::run_import(settings, path, |outcome| {
        let line = format_outcome(outcome);
        // println through the bar keeps the spinner from overwriting lines
        if outcome.is_success() {
            spinner.println(format!("{}", line.as_str().green()));
        } else {
            spinner.println(format!("{}", line.as_str().red()));
        }
        spinner.set_message(format!("Row {}", outcome.line));
    });
    spinner.finish_and_clear();

    let summary = result.with_context(|| format!("Import of {} failed", path.display()))?;
    println!("{}", format_summary(&summary).as_str().bold());
    Ok(summary)
}
