//! Settings loader.
//!
//! `ENV` (default `dev`) picks the dotenv file `envs/.env.<ENV>`; variables
//! already present in the process environment win over the file, so a CI job
//! can inject secrets without touching disk. The result is an immutable
//! [`Settings`] value built once in `main` and passed down by reference.

use crate::error::SettingsError;
use config::{Config as ConfigLoader, Environment};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_ENV: &str = "dev";
pub const DEFAULT_ENV_DIR: &str = "envs";
pub const DEFAULT_API_VERSION: &str = "52.0";

/// Process-wide configuration. Every `SF_*` field is guaranteed non-empty.
#[derive(Clone)]
pub struct Settings {
    pub env: String,
    pub sf_user: String,
    pub sf_password: String,
    pub sf_domain: String,
    pub sf_token: String,
    pub sf_api_base_url: String,
    /// API version without the leading `v`, e.g. `52.0`.
    pub api_version: String,
}

// Shape produced by the config crate.
#[derive(Debug, Deserialize)]
struct RawSettings {
    #[serde(alias = "SF_USER")]
    sf_user: Option<String>,
    #[serde(alias = "SF_PASSWORD")]
    sf_password: Option<String>,
    #[serde(alias = "SF_DOMAIN")]
    sf_domain: Option<String>,
    #[serde(alias = "SF_TOKEN")]
    sf_token: Option<String>,
    #[serde(alias = "SF_API_BASE_URL")]
    sf_api_base_url: Option<String>,
    #[serde(alias = "SF_API_VERSION")]
    sf_api_version: Option<String>,
}

impl Settings {
    /// Load settings for `env_override`, or `$ENV`, or `dev`.
    pub fn load(env_override: Option<&str>) -> Result<Self, SettingsError> {
        let process: HashMap<String, String> = std::env::vars().collect();

        let env = env_override
            .map(str::to_owned)
            .or_else(|| process.get("ENV").cloned())
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENV.to_string());

        let dir = process
            .get("SF_ENV_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ENV_DIR));
        let file_vars = read_env_file(&env_file_path(&dir, &env))?;

        Self::from_sources(&env, file_vars, process)
    }

    /// Merge file values with process values (process wins) and validate.
    pub fn from_sources(
        env: &str,
        file_vars: HashMap<String, String>,
        process_vars: HashMap<String, String>,
    ) -> Result<Self, SettingsError> {
        let raw: RawSettings = ConfigLoader::builder()
            .add_source(Environment::default().source(Some(sf_keys(file_vars))))
            .add_source(Environment::default().source(Some(sf_keys(process_vars))))
            .build()?
            .try_deserialize()?;

        let settings = Settings {
            env: env.trim().to_string(),
            sf_user: required(raw.sf_user, "SF_USER")?,
            sf_password: required(raw.sf_password, "SF_PASSWORD")?,
            sf_domain: required(raw.sf_domain, "SF_DOMAIN")?,
            sf_token: required(raw.sf_token, "SF_TOKEN")?,
            sf_api_base_url: required(raw.sf_api_base_url, "SF_API_BASE_URL")?
                .trim_end_matches('/')
                .to_string(),
            api_version: normalize_version(raw.sf_api_version.as_deref()),
        };

        tracing::debug!(settings = ?settings, "Settings loaded");
        Ok(settings)
    }

    pub fn is_production(&self) -> bool {
        self.env.eq_ignore_ascii_case("prod")
    }
}

// Secrets stay out of logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("env", &self.env)
            .field("sf_user", &self.sf_user)
            .field("sf_password", &"***")
            .field("sf_domain", &self.sf_domain)
            .field("sf_token", &"***")
            .field("sf_api_base_url", &self.sf_api_base_url)
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// `<dir>/.env.<env>`
pub fn env_file_path(dir: &Path, env: &str) -> PathBuf {
    dir.join(format!(".env.{}", env))
}

/// Read a dotenv file into a map. A missing file yields an empty map.
pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>, SettingsError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No env file, using process environment only");
        return Ok(HashMap::new());
    }

    let to_err = |source| SettingsError::EnvFile {
        path: path.to_path_buf(),
        source,
    };
    let mut vars = HashMap::new();
    for item in dotenvy::from_path_iter(path).map_err(to_err)? {
        let (key, value) = item.map_err(to_err)?;
        vars.insert(key, value);
    }
    Ok(vars)
}

fn sf_keys(vars: HashMap<String, String>) -> config::Map<String, String> {
    vars.into_iter().filter(|(k, _)| k.starts_with("SF_")).collect()
}

fn required(value: Option<String>, key: &'static str) -> Result<String, SettingsError> {
    let value = value.ok_or(SettingsError::Missing(key))?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SettingsError::Empty(key));
    }
    Ok(trimmed.to_string())
}

fn normalize_version(raw: Option<&str>) -> String {
    let version = raw
        .map(|v| v.trim().trim_start_matches(['v', 'V']))
        .unwrap_or_default();
    if version.is_empty() {
        DEFAULT_API_VERSION.to_string()
    } else {
        version.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn full_vars() -> HashMap<String, String> {
        [
            ("SF_USER", "admin@example.com"),
            ("SF_PASSWORD", "hunter2"),
            ("SF_DOMAIN", "login"),
            ("SF_TOKEN", "tok123"),
            ("SF_API_BASE_URL", "https://example.my.salesforce.com/"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_loads_from_file_values() {
        let settings = Settings::from_sources("dev", full_vars(), HashMap::new()).unwrap();
        assert_eq!(settings.env, "dev");
        assert_eq!(settings.sf_user, "admin@example.com");
        assert_eq!(settings.sf_api_base_url, "https://example.my.salesforce.com");
        assert_eq!(settings.api_version, DEFAULT_API_VERSION);
    }

    #[test]
    fn test_process_env_overrides_file() {
        let mut process = HashMap::new();
        process.insert("SF_USER".to_string(), "ci@example.com".to_string());
        process.insert("PATH".to_string(), "/usr/bin".to_string());

        let settings = Settings::from_sources("dev", full_vars(), process).unwrap();
        assert_eq!(settings.sf_user, "ci@example.com");
        assert_eq!(settings.sf_token, "tok123");
    }

    #[test]
    fn test_missing_key_is_reported_by_name() {
        let mut vars = full_vars();
        vars.remove("SF_TOKEN");

        let err = Settings::from_sources("dev", vars, HashMap::new()).unwrap_err();
        assert!(matches!(err, SettingsError::Missing("SF_TOKEN")));
    }

    #[test]
    fn test_blank_value_is_rejected() {
        let mut vars = full_vars();
        vars.insert("SF_DOMAIN".to_string(), "   ".to_string());

        let err = Settings::from_sources("dev", vars, HashMap::new()).unwrap_err();
        assert!(matches!(err, SettingsError::Empty("SF_DOMAIN")));
    }

    #[test]
    fn test_api_version_accepts_v_prefix() {
        let mut vars = full_vars();
        vars.insert("SF_API_VERSION".to_string(), "v58.0".to_string());

        let settings = Settings::from_sources("dev", vars, HashMap::new()).unwrap();
        assert_eq!(settings.api_version, "58.0");
    }

    #[test]
    fn test_is_production() {
        let prod = Settings::from_sources("PROD", full_vars(), HashMap::new()).unwrap();
        let stg = Settings::from_sources("stg", full_vars(), HashMap::new()).unwrap();
        assert!(prod.is_production());
        assert!(!stg.is_production());
    }

    #[test]
    fn test_debug_hides_secrets() {
        let settings = Settings::from_sources("dev", full_vars(), HashMap::new()).unwrap();
        let printed = format!("{:?}", settings);
        assert!(!printed.contains("hunter2"));
        assert!(!printed.contains("tok123"));
        assert!(printed.contains("admin@example.com"));
    }

    #[test]
    fn test_read_env_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = env_file_path(dir.path(), "stg");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "SF_USER=stg@example.com").unwrap();
        writeln!(file, "SF_TOKEN=\"quoted token\"").unwrap();

        let vars = read_env_file(&path).unwrap();
        assert_eq!(vars["SF_USER"], "stg@example.com");
        assert_eq!(vars["SF_TOKEN"], "quoted token");
    }

    #[test]
    fn test_missing_env_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let vars = read_env_file(&env_file_path(dir.path(), "nope")).unwrap();
        assert!(vars.is_empty());
    }
}
