// REST client module: a small blocking client bound to one resource path of
// the CRM REST API. Every call carries the session headers obtained at
// construction and returns an explicit `Result` instead of a fake 500.

use crate::auth;
use crate::error::{ApiError, AuthError};
use crate::settings::Settings;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `services/data/v<version>/sobjects/<object>`
pub fn sobject_path(api_version: &str, object: &str) -> String {
    format!("services/data/v{}/sobjects/{}", api_version, object)
}

/// Per-call options. Call-time headers override the client's base headers.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub headers: Option<HeaderMap>,
    pub timeout: Duration,
    pub query: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: None,
            timeout: DEFAULT_TIMEOUT,
            query: Vec::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.headers = Some(headers);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_string(value).map_err(ApiError::Serialize)?;
        Ok(self.body(body))
    }
}

/// A successful (2xx) response with its body already read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    /// Strict typed decode of the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body).map_err(ApiError::Decode)
    }
}

/// Best-effort JSON decode. Non-JSON bodies come back wrapped with the raw text.
pub fn parse_json_body(response: &ApiResponse) -> Value {
    match serde_json::from_str(&response.body) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "Response body is not JSON");
            json!({
                "message": "decode failed",
                "response": response.body,
            })
        }
    }
}

/// Client for one REST resource. Read-only after construction.
pub struct SalesforceClient {
    http: Client,
    base_url: String,
    api_version: String,
    url: String,
    base_headers: HeaderMap,
}

impl SalesforceClient {
    /// Log in with the configured credentials and bind the client to `path`.
    pub fn connect(
        settings: &Settings,
        path: &str,
        additional_headers: Option<HeaderMap>,
    ) -> Result<Self, AuthError> {
        let http = Client::builder()
            .build()
            .map_err(|source| AuthError::Transport {
                url: settings.sf_api_base_url.clone(),
                source,
            })?;
        let session = auth::login(&http, settings)?;
        Ok(Self::with_session(
            http,
            settings,
            path,
            session.headers(),
            additional_headers,
        ))
    }

    /// Build a client from already obtained session headers.
    ///
    /// Header precedence, lowest first: JSON defaults, session headers,
    /// `additional_headers`.
    pub fn with_session(
        http: Client,
        settings: &Settings,
        path: &str,
        session_headers: HeaderMap,
        additional_headers: Option<HeaderMap>,
    ) -> Self {
        let base_url = settings.sf_api_base_url.trim_end_matches('/').to_string();
        let url = format!("{}/{}", base_url, path.trim_start_matches('/'));

        let mut base_headers = HeaderMap::new();
        base_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        base_headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        base_headers.extend(session_headers);
        if let Some(extra) = additional_headers {
            base_headers.extend(extra);
        }

        SalesforceClient {
            http,
            base_url,
            api_version: settings.api_version.clone(),
            url,
            base_headers,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn base_headers(&self) -> &HeaderMap {
        &self.base_headers
    }

    /// Composite endpoint for the configured API version.
    pub fn composite_url(&self) -> String {
        format!("{}/services/data/v{}/composite", self.base_url, self.api_version)
    }

    pub fn send(&self, method: Method, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        self.send_to(&self.url, method, options)
    }

    pub fn get(&self, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        self.send(Method::GET, options)
    }

    pub fn post(&self, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        self.send(Method::POST, options)
    }

    pub fn patch(&self, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        self.send(Method::PATCH, options)
    }

    /// Post several operations in one composite call. Targets the composite
    /// endpoint regardless of this client's resource path.
    pub fn composite_request<T: Serialize + ?Sized>(&self, data: &T) -> Result<ApiResponse, ApiError> {
        let payload = serde_json::to_string(data).map_err(ApiError::Serialize)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, HeaderValue::from(payload.len()));

        let options = RequestOptions::new().headers(headers).body(payload);
        self.send_to(&self.composite_url(), Method::POST, options)
    }

    fn send_to(&self, url: &str, method: Method, options: RequestOptions) -> Result<ApiResponse, ApiError> {
        let mut headers = self.base_headers.clone();
        if let Some(extra) = options.headers {
            headers.extend(extra);
        }

        tracing::info!(
            method = %method,
            url = %url,
            headers = ?loggable_headers(&headers),
            timeout_secs = options.timeout.as_secs_f64(),
            query = ?options.query,
            body_bytes = options.body.as_ref().map_or(0, String::len),
            "Salesforce REST API request"
        );

        let mut req = self
            .http
            .request(method.clone(), url)
            .headers(headers)
            .timeout(options.timeout);
        if !options.query.is_empty() {
            req = req.query(&options.query);
        }
        if let Some(body) = options.body {
            req = req.body(body);
        }

        let transport = |source: reqwest::Error| {
            tracing::error!(method = %method, url = %url, error = %source, "Salesforce REST API request failed");
            ApiError::Transport {
                url: url.to_string(),
                source,
            }
        };

        let res = req.send().map_err(transport)?;
        let status = res.status();
        let body = res.text().map_err(transport)?;

        if !status.is_success() {
            tracing::error!(method = %method, url = %url, status = %status, body = %body, "Salesforce REST API error response");
            return Err(ApiError::Http {
                url: url.to_string(),
                status,
                body,
            });
        }

        tracing::debug!(status = %status, "Salesforce REST API response");
        Ok(ApiResponse { status, body })
    }
}

// Header pairs for logging with the session token masked.
fn loggable_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if name == AUTHORIZATION {
                "Bearer ***".to_string()
            } else {
                value.to_str().unwrap_or("<binary>").to_string()
            };
            (name.to_string(), shown)
        })
        .collect()
}
