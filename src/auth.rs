// Session login: exchanges username, password and security token for a
// session id using the platform's SOAP `login` call, then exposes the
// headers every REST request needs.

use crate::error::AuthError;
use crate::settings::Settings;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

/// An authenticated session. Not refreshed; lives as long as the client.
#[derive(Clone)]
pub struct Session {
    authorization: HeaderValue,
    /// Instance URL returned by the login call, if any.
    pub server_url: Option<String>,
}

impl Session {
    /// Wrap an already obtained session id.
    pub fn from_session_id(session_id: &str) -> Result<Self, AuthError> {
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", session_id))
            .map_err(|_| AuthError::MalformedResponse("session id is not a valid header value".into()))?;
        authorization.set_sensitive(true);
        Ok(Session {
            authorization,
            server_url: None,
        })
    }

    /// Headers carried by every REST call made with this session.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(AUTHORIZATION, self.authorization.clone());
        headers.insert("x-prettyprint", HeaderValue::from_static("1"));
        headers
    }
}

/// `https://<domain>.salesforce.com`, or the domain itself when it is
/// already an absolute URL.
pub fn login_base(domain: &str) -> String {
    if domain.starts_with("http://") || domain.starts_with("https://") {
        domain.trim_end_matches('/').to_string()
    } else {
        format!("https://{}.salesforce.com", domain)
    }
}

pub fn login_url(settings: &Settings) -> String {
    format!(
        "{}/services/Soap/u/{}",
        login_base(&settings.sf_domain),
        settings.api_version
    )
}

/// Perform the login round trip. Any failure here is fatal for the batch.
pub fn login(http: &Client, settings: &Settings) -> Result<Session, AuthError> {
    let url = login_url(settings);
    tracing::info!(url = %url, user = %settings.sf_user, "Logging in");

    let password = format!("{}{}", settings.sf_password, settings.sf_token);
    let envelope = login_envelope(&settings.sf_user, &password);

    let res = http
        .post(&url)
        .header(CONTENT_TYPE, "text/xml; charset=UTF-8")
        .header("SOAPAction", "login")
        .body(envelope)
        .send()
        .map_err(|source| AuthError::Transport {
            url: url.clone(),
            source,
        })?;
    let status = res.status();
    let text = res.text().map_err(|source| AuthError::Transport {
        url: url.clone(),
        source,
    })?;

    if let Some(session_id) = element_text(&text, "sessionId") {
        let mut session = Session::from_session_id(session_id)?;
        session.server_url = element_text(&text, "serverUrl").map(str::to_owned);
        tracing::info!(server_url = ?session.server_url, "Login succeeded");
        return Ok(session);
    }

    if let Some(fault) = element_text(&text, "faultstring") {
        let code = element_text(&text, "exceptionCode").unwrap_or("UNKNOWN");
        tracing::error!(status = %status, code = %code, "Login rejected");
        return Err(AuthError::Rejected {
            code: code.to_string(),
            message: unescape_xml(fault),
        });
    }

    if !status.is_success() {
        tracing::error!(status = %status, "Login failed");
        return Err(AuthError::Rejected {
            code: status.to_string(),
            message: text,
        });
    }

    Err(AuthError::MalformedResponse("no sessionId element".into()))
}

fn login_envelope(username: &str, password: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope
        xmlns:xsd="http://www.w3.org/2001/XMLSchema"
        xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
        xmlns:env="http://schemas.xmlsoap.org/soap/envelope/"
        xmlns:urn="urn:partner.soap.sforce.com">
    <env:Header>
        <urn:CallOptions>
            <urn:client>sf-user-import</urn:client>
        </urn:CallOptions>
    </env:Header>
    <env:Body>
        <n1:login xmlns:n1="urn:partner.soap.sforce.com">
            <n1:username>{}</n1:username>
            <n1:password>{}</n1:password>
        </n1:login>
    </env:Body>
</env:Envelope>"#,
        escape_xml(username),
        escape_xml(password)
    )
}

fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn unescape_xml(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Text of the first element whose local name is `tag`, namespace prefix ignored.
fn element_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let mut rest = xml;
    while let Some(open) = rest.find('<') {
        rest = &rest[open + 1..];
        let name_end = rest.find(|c: char| c == '>' || c.is_whitespace())?;
        let name = &rest[..name_end];
        let local = name.rsplit(':').next().unwrap_or(name);
        if local == tag && !name.starts_with('/') {
            let body = &rest[rest.find('>')? + 1..];
            return Some(body[..body.find("</")?].trim());
        }
    }
    None
}
