//! Request options and request construction.
//!
//! [`PreparedRequest::build`] is the whole defaulting policy: it parses the
//! URL, applies default headers the caller left unset, and decides where the
//! encoded data goes (query string, body, or nowhere) based on the verb. It
//! performs no I/O, so everything it decides can be checked directly.

use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use percent_encoding::percent_decode_str;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_LENGTH, HOST, USER_AGENT,
};
use url::Url;

use crate::config::HeaderDefaults;
use crate::error::{RestError, Result};
use crate::params::Params;
use crate::response::Body;

/// HTTP verb, which also selects where request data is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// Data goes in the query string.
    Get,
    /// Data goes in the body.
    Post,
    /// Data is ignored.
    Head,
    /// Data goes in the body.
    Put,
    /// Data goes in the query string.
    Delete,
}

impl Verb {
    /// Method name as sent on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Head => "HEAD",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }

    /// Data goes into the query string.
    pub fn sends_query(self) -> bool {
        matches!(self, Verb::Get | Verb::Delete)
    }

    /// Data goes into the body.
    pub fn sends_body(self) -> bool {
        matches!(self, Verb::Post | Verb::Put)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Verb> for reqwest::Method {
    fn from(verb: Verb) -> Self {
        match verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Post => reqwest::Method::POST,
            Verb::Head => reqwest::Method::HEAD,
            Verb::Put => reqwest::Method::PUT,
            Verb::Delete => reqwest::Method::DELETE,
        }
    }
}

/// How the response body is handed back.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResponseType {
    /// Raw text.
    #[default]
    Text,
    /// Parsed JSON; also defaults `Accept` to JSON.
    Json,
}

impl ResponseType {
    /// Map a type hint string. Only `"json"` selects JSON.
    pub fn from_hint(hint: &str) -> Self {
        if hint == "json" {
            ResponseType::Json
        } else {
            ResponseType::Text
        }
    }
}

/// Request data: already encoded, or parameters to encode.
#[derive(Debug, Clone)]
pub enum RequestData {
    /// Sent exactly as given.
    Encoded(String),
    /// Serialized with [`Params::encode`].
    Params(Params),
}

impl RequestData {
    /// The encoded form sent on the wire.
    pub fn encode(&self) -> String {
        match self {
            RequestData::Encoded(s) => s.clone(),
            RequestData::Params(params) => params.encode(),
        }
    }
}

impl From<String> for RequestData {
    fn from(s: String) -> Self {
        RequestData::Encoded(s)
    }
}

impl From<&str> for RequestData {
    fn from(s: &str) -> Self {
        RequestData::Encoded(s.to_string())
    }
}

impl From<Params> for RequestData {
    fn from(params: Params) -> Self {
        RequestData::Params(params)
    }
}

/// Called once with the decoded body and status code.
pub type OnComplete = Box<dyn FnOnce(Body, u16) + Send + 'static>;

/// Per-call options.
#[derive(Default)]
pub struct RequestOptions {
    /// Query or body data.
    pub data: Option<RequestData>,
    /// Completion callback.
    pub on_complete: Option<OnComplete>,
    /// Response handling.
    pub response_type: ResponseType,
    /// Header overrides, applied before defaults.
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request data.
    pub fn data(mut self, data: impl Into<RequestData>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the completion callback.
    pub fn on_complete<F>(mut self, f: F) -> Self
    where
        F: FnOnce(Body, u16) + Send + 'static,
    {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Set the response type.
    pub fn response_type(mut self, response_type: ResponseType) -> Self {
        self.response_type = response_type;
        self
    }

    /// Shorthand for `response_type(ResponseType::Json)`.
    pub fn json(self) -> Self {
        self.response_type(ResponseType::Json)
    }

    /// Add a header override.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("data", &self.data)
            .field("on_complete", &self.on_complete.as_ref().map(|_| ".."))
            .field("response_type", &self.response_type)
            .field("headers", &self.headers)
            .finish()
    }
}

/// A fully resolved request, ready to send.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    verb: Verb,
    url: Url,
    headers: HeaderMap,
    body: Option<String>,
}

impl PreparedRequest {
    /// Resolve URL, headers, query and body for one call.
    ///
    /// Query data goes through the URL's own serializer, which escapes the
    /// characters a query may not carry raw: `'` becomes `%27`, a space
    /// `%20` and `#` `%23`. The body is sent exactly as encoded.
    pub fn build(
        verb: Verb,
        url: &str,
        options: &RequestOptions,
        defaults: &HeaderDefaults,
    ) -> Result<Self> {
        let mut url = Url::parse(url)?;
        match url.scheme() {
            "http" | "https" => {}
            other => return Err(RestError::UnsupportedScheme(other.to_string())),
        }
        let host = url
            .host_str()
            .ok_or_else(|| RestError::MissingHost(url.to_string()))?
            .to_string();

        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            headers.insert(header_name(name)?, header_value(name, value)?);
        }

        if !headers.contains_key(HOST) {
            headers.insert(HOST, header_value("Host", &host)?);
        }
        if !headers.contains_key(USER_AGENT) {
            headers.insert(USER_AGENT, header_value("User-Agent", &defaults.user_agent)?);
        }
        if let Some(userinfo) = userinfo(&url) {
            if !headers.contains_key(AUTHORIZATION) {
                let credentials = format!("Basic {}", STANDARD.encode(userinfo));
                headers.insert(AUTHORIZATION, header_value("Authorization", &credentials)?);
            }
        }
        if options.response_type == ResponseType::Json && !headers.contains_key(ACCEPT) {
            headers.insert(ACCEPT, header_value("Accept", &defaults.json_accept)?);
        }

        // Credentials travel only in the Authorization header. http(s) URLs
        // with a host always accept userinfo changes.
        let cleared = url.set_username("").and_then(|()| url.set_password(None));
        debug_assert!(cleared.is_ok());

        let encoded = options
            .data
            .as_ref()
            .map(RequestData::encode)
            .unwrap_or_default();

        let explicit_query = url.query().is_some_and(|q| !q.is_empty());
        if !explicit_query {
            url.set_query(None);
            if verb.sends_query() && !encoded.is_empty() {
                url.set_query(Some(&encoded));
            }
        }

        let mut body = None;
        if verb.sends_body() {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(encoded.len()));
            if !encoded.is_empty() {
                body = Some(encoded);
            }
        }

        Ok(Self {
            verb,
            url,
            headers,
            body,
        })
    }

    /// The verb.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// Final URL, without credentials.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request path including the query string, if any.
    pub fn path(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }

    /// Explicit port, else 443 for https, else 80.
    pub fn port(&self) -> u16 {
        self.url
            .port()
            .unwrap_or(if self.url.scheme() == "https" { 443 } else { 80 })
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A single header value as text.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Body, for POST and PUT with non-empty data.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    pub(crate) fn into_parts(self) -> (Verb, Url, HeaderMap, Option<String>) {
        (self.verb, self.url, self.headers, self.body)
    }
}

/// Decoded `user[:password]` from the URL, if it carries any.
fn userinfo(url: &Url) -> Option<String> {
    let user = percent_decode_str(url.username()).decode_utf8_lossy();
    match url.password() {
        Some(password) => {
            let password = percent_decode_str(password).decode_utf8_lossy();
            Some(format!("{}:{}", user, password))
        }
        None if !user.is_empty() => Some(user.into_owned()),
        None => None,
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes()).map_err(|e| RestError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value).map_err(|e| RestError::InvalidHeader {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
