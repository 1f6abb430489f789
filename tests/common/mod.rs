//! Shared fixtures for tests that talk to a mock CRM server.

#![allow(dead_code)]

use sf_user_import::settings::Settings;
use std::collections::HashMap;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SESSION_ID: &str = "00Dxx0000001gPL!AR8AQJXg5oj8";

pub const USER_PATH: &str = "/services/data/v52.0/sobjects/User";
pub const COMPOSITE_PATH: &str = "/services/data/v52.0/composite";
pub const LOGIN_PATH: &str = "/services/Soap/u/52.0";

pub const CSV_HEADER: &str = "FirstName,LastName,Email,Username,Alias,TimeZoneSidKey,LocaleSidKey,EmailEncodingKey,LanguageLocaleKey,ProfileId";

pub fn login_ok() -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="urn:partner.soap.sforce.com"><soapenv:Body><loginResponse><result><passwordExpired>false</passwordExpired><serverUrl>https://na1.salesforce.com/services/Soap/u/52.0/00Dxx</serverUrl><sessionId>{}</sessionId></result></loginResponse></soapenv:Body></soapenv:Envelope>"#,
        SESSION_ID
    )
}

pub const LOGIN_FAULT: &str = r#"<?xml version="1.0" encoding="UTF-8"?><soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns:sf="urn:fault.partner.soap.sforce.com" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><soapenv:Body><soapenv:Fault><faultcode>sf:INVALID_LOGIN</faultcode><faultstring>INVALID_LOGIN: Invalid username, password, security token; or user locked out.</faultstring><detail><sf:LoginFault xsi:type="sf:LoginFault"><sf:exceptionCode>INVALID_LOGIN</sf:exceptionCode></sf:LoginFault></detail></soapenv:Fault></soapenv:Body></soapenv:Envelope>"#;

/// Settings pointing both login and REST calls at `server`.
pub fn settings_for(server: &MockServer) -> Settings {
    let vars: HashMap<String, String> = [
        ("SF_USER", "admin@example.com"),
        ("SF_PASSWORD", "secret"),
        ("SF_DOMAIN", server.uri().as_str()),
        ("SF_TOKEN", "TOKEN"),
        ("SF_API_BASE_URL", server.uri().as_str()),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    Settings::from_sources("dev", vars, HashMap::new()).unwrap()
}

pub async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(header("soapaction", "login"))
        .respond_with(ResponseTemplate::new(200).set_body_string(login_ok()))
        .mount(server)
        .await;
}

pub async fn mount_login_fault(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string(LOGIN_FAULT))
        .mount(server)
        .await;
}

pub fn csv_row(username: &str) -> String {
    format!(
        "Taro,Yamada,{u},{u},tyama,Asia/Tokyo,ja_JP,UTF-8,ja,00e000000000001",
        u = username
    )
}

/// Run blocking client code off the async runtime.
pub async fn blocking<T, F>(f: F) -> T
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.unwrap()
}
