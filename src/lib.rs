// Library root
// -----------
// Bulk-creates CRM users from a CSV file. The binary (`main.rs`) loads the
// settings, asks for confirmation on production and hands off to `ui`.
//
// Module responsibilities:
// - `settings`: immutable configuration from `envs/.env.<ENV>` and the
//   process environment.
// - `auth`: username/password/security-token login producing session headers.
// - `api`: blocking REST client bound to one resource path.
// - `importer`: CSV rows to User create calls, one row at a time.
// - `ui`: confirmation prompt and console reporting.
// - `error`: error enums shared by the modules above.
pub mod api;
pub mod auth;
pub mod error;
pub mod importer;
pub mod settings;
pub mod ui;
