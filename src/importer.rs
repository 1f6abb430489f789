//! Batch user import.
//!
//! Rows are processed strictly in file order, one create call per row. A row
//! that cannot be mapped or is refused by the API is reported and skipped;
//! only a failed login or an unreadable header stops the batch.

use crate::api::{parse_json_body, sobject_path, RequestOptions, SalesforceClient};
use crate::error::{ApiError, ImportError, RowError};
use crate::settings::Settings;
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io;
use std::path::Path;

pub const USERNAME_COLUMN: &str = "Username";

pub const REQUIRED_COLUMNS: [&str; 10] = [
    "FirstName",
    "LastName",
    "Email",
    "Username",
    "Alias",
    "TimeZoneSidKey",
    "LocaleSidKey",
    "EmailEncodingKey",
    "LanguageLocaleKey",
    "ProfileId",
];

/// Payload of one User create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub username: String,
    pub alias: String,
    pub time_zone_sid_key: String,
    pub locale_sid_key: String,
    pub email_encoding_key: String,
    pub language_locale_key: String,
    pub profile_id: String,
}

impl UserRecord {
    /// Map a CSV row by header name. Columns may appear in any order.
    pub fn from_row(headers: &StringRecord, row: &StringRecord) -> Result<Self, RowError> {
        let field = |name: &'static str| column(headers, row, name).ok_or(RowError::MissingColumn(name));

        Ok(UserRecord {
            first_name: field("FirstName")?,
            last_name: field("LastName")?,
            email: field("Email")?,
            username: field("Username")?,
            alias: field("Alias")?,
            time_zone_sid_key: field("TimeZoneSidKey")?,
            locale_sid_key: field("LocaleSidKey")?,
            email_encoding_key: field("EmailEncodingKey")?,
            language_locale_key: field("LanguageLocaleKey")?,
            profile_id: field("ProfileId")?,
        })
    }
}

fn column(headers: &StringRecord, row: &StringRecord, name: &str) -> Option<String> {
    let index = headers.iter().position(|h| h == name)?;
    row.get(index).map(str::to_owned)
}

/// Anything that can create a user and hand back the API's result payload.
pub trait UserCreator {
    fn create_user(&self, record: &UserRecord) -> Result<Value, ApiError>;
}

impl UserCreator for SalesforceClient {
    fn create_user(&self, record: &UserRecord) -> Result<Value, ApiError> {
        let response = self.post(RequestOptions::new().json(record)?)?;
        Ok(parse_json_body(&response))
    }
}

/// Result of one CSV row.
#[derive(Debug)]
pub struct RowOutcome {
    /// 1-based line in the input file.
    pub line: u64,
    pub username: Option<String>,
    pub result: Result<Value, RowError>,
}

impl RowOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub created: usize,
    pub failed: usize,
}

impl ImportSummary {
    pub fn total(&self) -> usize {
        self.created + self.failed
    }

    fn record(&mut self, outcome: &RowOutcome) {
        if outcome.is_success() {
            self.created += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Create one user per CSV row, calling `on_outcome` after each row.
pub fn import_users<C, R, F>(creator: &C, input: R, mut on_outcome: F) -> Result<ImportSummary, ImportError>
where
    C: UserCreator + ?Sized,
    R: io::Read,
    F: FnMut(&RowOutcome),
{
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(input);
    let headers = reader.headers().map_err(ImportError::Header)?.clone();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| !headers.iter().any(|h| h == *name))
        .collect();
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "Header row lacks required columns, every row will fail");
    }

    let mut summary = ImportSummary::default();
    for (index, row) in reader.records().enumerate() {
        let fallback_line = index as u64 + 2;
        let (outcome, fatal) = match row {
            Ok(row) => {
                let line = row.position().map_or(fallback_line, |p| p.line());
                let username = column(&headers, &row, USERNAME_COLUMN);
                let result = UserRecord::from_row(&headers, &row)
                    .and_then(|record| creator.create_user(&record).map_err(RowError::from));
                (RowOutcome { line, username, result }, false)
            }
            Err(e) => {
                let line = e.position().map_or(fallback_line, |p| p.line());
                // An I/O error would repeat on every following read.
                let fatal = matches!(e.kind(), csv::ErrorKind::Io(_));
                (
                    RowOutcome {
                        line,
                        username: None,
                        result: Err(RowError::Csv(e)),
                    },
                    fatal,
                )
            }
        };

        match &outcome.result {
            Ok(_) => tracing::info!(line = outcome.line, username = ?outcome.username, "User created"),
            Err(e) => tracing::warn!(line = outcome.line, username = ?outcome.username, error = %e, "User not created"),
        }

        summary.record(&outcome);
        on_outcome(&outcome);
        if fatal {
            tracing::error!(line = outcome.line, "Stopping import after read error");
            break;
        }
    }

    tracing::info!(created = summary.created, failed = summary.failed, "Import finished");
    Ok(summary)
}

/// Log in, then import every row of the CSV file at `path`.
pub fn run_import<F>(settings: &Settings, path: &Path, on_outcome: F) -> Result<ImportSummary, ImportError>
where
    F: FnMut(&RowOutcome),
{
    let client = SalesforceClient::connect(settings, &sobject_path(&settings.api_version, "User"), None)?;

    let file = File::open(path).map_err(|source| ImportError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    import_users(&client, file, on_outcome)
}
