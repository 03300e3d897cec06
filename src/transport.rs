use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde_json::Value as JsonValue;

use crate::HttpFailure;

/// Header name to value mapping sent with a request.
pub type Headers = BTreeMap<String, String>;

/// Outcome of a single transport call.
pub type TransportResult = std::result::Result<JsonValue, HttpFailure>;

/// HTTP verbs used by the API.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        })
    }
}

/// A file part of a multipart body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub filename: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

/// Multipart form body. Kept as plain data so it can be rebuilt for every attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MultipartBody {
    pub fields: Vec<(String, String)>,
    pub files: Vec<FilePart>,
}

impl MultipartBody {
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    /// Returns the value of the first text field with `name`.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }

    fn to_form(&self) -> Result<Form, HttpFailure> {
        let mut form = Form::new();
        for (name, value) in &self.fields {
            form = form.text(name.clone(), value.clone());
        }
        for file in &self.files {
            let part = Part::bytes(file.content.clone())
                .file_name(file.filename.clone())
                .mime_str(&file.content_type)
                .map_err(|err| {
                    HttpFailure::network(format!(
                        "invalid MIME type '{}' for '{}': {err}",
                        file.content_type, file.filename
                    ))
                })?;
            form = form.part(file.field.clone(), part);
        }
        Ok(form)
    }
}

/// Request payload.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    Json(JsonValue),
    Multipart(MultipartBody),
}

impl RequestBody {
    pub fn is_json(&self) -> bool {
        matches!(self, Self::Json(_))
    }
}

/// One logical HTTP call, built fresh for every operation.
#[derive(Clone, Debug, PartialEq)]
pub struct RequestDescriptor {
    pub url: String,
    pub method: Method,
    pub body: Option<RequestBody>,
    pub headers: Headers,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            body: None,
            headers: Headers::new(),
        }
    }

    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_json(self, body: JsonValue) -> Self {
        self.with_body(RequestBody::Json(body))
    }
}

/// The four verbs the executor drives.
///
/// Implementations return the parsed response body on 2xx and an
/// [`HttpFailure`] otherwise. They must not retry on their own.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait Transport {
    async fn get(&self, url: &str, headers: &Headers) -> TransportResult;

    async fn post(&self, url: &str, body: Option<&RequestBody>, headers: &Headers)
        -> TransportResult;

    async fn put(&self, url: &str, body: Option<&RequestBody>, headers: &Headers)
        -> TransportResult;

    async fn delete(&self, url: &str, headers: &Headers) -> TransportResult;
}

/// Default transport backed by `reqwest` (Fetch API on WASM).
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    pub fn new(timeout_ms: u64) -> Self {
        Self::with_client(reqwest::Client::new(), timeout_ms)
    }

    pub fn with_client(http: reqwest::Client, timeout_ms: u64) -> Self {
        Self {
            http,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    async fn send(
        &self,
        method: reqwest::Method,
        url: &str,
        body: Option<&RequestBody>,
        headers: &Headers,
    ) -> TransportResult {
        // On WASM, reqwest uses AbortController for the timeout.
        let mut builder = self.http.request(method, url).timeout(self.timeout);
        for (name, value) in headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match body {
            Some(RequestBody::Json(json)) => builder.json(json),
            Some(RequestBody::Multipart(multipart)) => builder.multipart(multipart.to_form()?),
            None => builder,
        };

        let response = builder.send().await.map_err(failure_from_reqwest)?;
        let status = response.status();
        let text = response.text().await.map_err(failure_from_reqwest)?;
        let data = parse_body(text);

        if status.is_success() {
            return Ok(data.unwrap_or(JsonValue::Null));
        }

        let message = data
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(JsonValue::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_owned()
            });
        Err(HttpFailure {
            status: Some(status.as_u16()),
            data,
            message,
            timed_out: false,
        })
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, headers: &Headers) -> TransportResult {
        self.send(reqwest::Method::GET, url, None, headers).await
    }

    async fn post(
        &self,
        url: &str,
        body: Option<&RequestBody>,
        headers: &Headers,
    ) -> TransportResult {
        self.send(reqwest::Method::POST, url, body, headers).await
    }

    async fn put(
        &self,
        url: &str,
        body: Option<&RequestBody>,
        headers: &Headers,
    ) -> TransportResult {
        self.send(reqwest::Method::PUT, url, body, headers).await
    }

    async fn delete(&self, url: &str, headers: &Headers) -> TransportResult {
        self.send(reqwest::Method::DELETE, url, None, headers).await
    }
}

fn parse_body(text: String) -> Option<JsonValue> {
    if text.trim().is_empty() {
        return None;
    }
    Some(serde_json::from_str(&text).unwrap_or(JsonValue::String(text)))
}

fn failure_from_reqwest(err: reqwest::Error) -> HttpFailure {
    let message = err.to_string();
    if err.is_timeout() {
        return HttpFailure::timeout(message);
    }
    match err.status() {
        Some(status) => HttpFailure::status(status.as_u16(), message),
        None => HttpFailure::network(message),
    }
}
