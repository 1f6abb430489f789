// Entrypoint for the user import CLI.
// - Keeps `main` small: load settings, gate production, run the import.
// - Returns `anyhow::Result` so configuration and login failures exit non-zero.

use anyhow::Context;
use clap::Parser;
use sf_user_import::settings::Settings;
use sf_user_import::ui::{self, RunOutcome, TerminalPrompt};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const DEFAULT_INPUT: &str = "files/users.csv";

#[derive(Parser)]
#[command(
    name = "sf-user-import",
    about = "Create CRM users from the rows of a CSV file"
)]
struct Cli {
    /// CSV file with FirstName, LastName, Email, Username, Alias, TimeZoneSidKey,
    /// LocaleSidKey, EmailEncodingKey, LanguageLocaleKey and ProfileId columns.
    #[arg(default_value = DEFAULT_INPUT)]
    csv: PathBuf,

    /// Environment name; overrides $ENV (default: dev).
    #[arg(long)]
    env: Option<String>,
}

fn main() -> anyhow::Result<ExitCode> {
    // Diagnostics go to stderr; stdout carries the per-row report.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = Settings::load(cli.env.as_deref()).context("Failed to load settings")?;

    println!("Environment: {}", settings.env);

    let mut prompt = TerminalPrompt;
    let outcome = ui::run(&settings, &mut prompt, |s| {
        println!("====== Starting import ======");
        ui::import_with_progress(s, &cli.csv)
    })?;
    match outcome {
        RunOutcome::Declined => {
            println!("====== Aborted ======");
            Ok(ExitCode::from(1))
        }
        RunOutcome::Completed(_) => Ok(ExitCode::SUCCESS),
    }
}
