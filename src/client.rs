use std::fmt;
use std::sync::Arc;

use serde_json::Value as JsonValue;

use crate::{
    error::ErrorCode,
    executor::{RequestExecutor, SharedTransport},
    payload,
    template::{self, TemplateVars},
    transport::{Method, ReqwestTransport, RequestDescriptor},
    validate,
    wire::AudiencePayload,
    ClientOptions, ContactUpdate, Environment, MailError, NewContact, Result, SendEmail,
};

/// HTTP client for the mail, audience and contact API.
#[derive(Clone)]
pub struct MailClient {
    executor: RequestExecutor,
    base_url: String,
    api_key: String,
    options: ClientOptions,
    /// Set when the transport was built here and follows `options.timeout_ms`.
    owns_transport: bool,
}

impl fmt::Debug for MailClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("options", &self.options)
            .finish()
    }
}

impl MailClient {
    /// Creates a client with default options and the `reqwest` transport.
    pub fn new(base_url: impl Into<String>, api_key: impl AsRef<str>) -> Self {
        let options = ClientOptions::default();
        let transport = Arc::new(ReqwestTransport::new(options.timeout_ms));
        Self {
            owns_transport: true,
            ..Self::with_transport(base_url, api_key, transport)
        }
    }

    /// Creates a client on top of a custom [`Transport`](crate::Transport).
    pub fn with_transport(
        base_url: impl Into<String>,
        api_key: impl AsRef<str>,
        transport: SharedTransport,
    ) -> Self {
        let base_url = base_url.into();
        let api_key = api_key.as_ref().trim().to_owned();
        Self {
            executor: RequestExecutor::new(transport, &api_key),
            base_url: base_url.trim().trim_end_matches('/').to_owned(),
            api_key,
            options: ClientOptions::default(),
            owns_transport: false,
        }
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `MAILWIRE_BASE_URL`: API root, e.g. `https://api.example.com/v1`
    /// - `MAILWIRE_API_KEY`: API key
    ///
    /// **Not available on `wasm32` targets.**
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> std::result::Result<Self, String> {
        let base_url = std::env::var("MAILWIRE_BASE_URL")
            .map_err(|_| "missing MAILWIRE_BASE_URL environment variable".to_owned())?;
        let api_key = std::env::var("MAILWIRE_API_KEY")
            .map_err(|_| "missing MAILWIRE_API_KEY environment variable".to_owned())?;
        if base_url.trim().is_empty() {
            return Err("MAILWIRE_BASE_URL is set but empty".to_owned());
        }
        if api_key.trim().is_empty() {
            return Err("MAILWIRE_API_KEY is set but empty".to_owned());
        }
        Ok(Self::new(base_url, api_key))
    }

    /// Applies timeout and retry options.
    ///
    /// The timeout only reaches the built-in transport; custom transports keep their own.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        if self.owns_transport && opts.timeout_ms != self.options.timeout_ms {
            let transport = Arc::new(ReqwestTransport::new(opts.timeout_ms));
            self.executor = RequestExecutor::new(transport, &self.api_key);
        }
        self.options = opts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Sends one email. Attachments are normalized or streamed as native files
    /// depending on the host environment.
    pub async fn send_email(&self, email: SendEmail) -> Result<JsonValue> {
        validate_send_email(&email)?;
        let body = payload::select(Environment::detect(), &email.attachments).encode(email)?;
        let descriptor = RequestDescriptor::new(Method::Post, self.url("/emails")).with_body(body);
        self.run(descriptor).await
    }

    /// Fills `{{name}}` placeholders in subject and content, then sends.
    pub async fn send_template_email(
        &self,
        mut email: SendEmail,
        vars: &TemplateVars,
    ) -> Result<JsonValue> {
        email.subject = template::render(&email.subject, vars);
        email.content = template::render(&email.content, vars);
        self.send_email(email).await
    }

    pub async fn create_audience(&self, name: &str) -> Result<JsonValue> {
        validate::required("name", name)?;
        let body = to_json(&AudiencePayload { name: name.trim() })?;
        self.run(RequestDescriptor::new(Method::Post, self.url("/audiences")).with_json(body))
            .await
    }

    pub async fn list_audiences(&self) -> Result<JsonValue> {
        self.run(RequestDescriptor::new(Method::Get, self.url("/audiences")))
            .await
    }

    pub async fn get_audience(&self, audience_id: &str) -> Result<JsonValue> {
        let url = self.audience_url(audience_id)?;
        self.run(RequestDescriptor::new(Method::Get, url)).await
    }

    pub async fn update_audience(&self, audience_id: &str, name: &str) -> Result<JsonValue> {
        let url = self.audience_url(audience_id)?;
        validate::required("name", name)?;
        let body = to_json(&AudiencePayload { name: name.trim() })?;
        self.run(RequestDescriptor::new(Method::Put, url).with_json(body))
            .await
    }

    pub async fn delete_audience(&self, audience_id: &str) -> Result<JsonValue> {
        let url = self.audience_url(audience_id)?;
        self.run(RequestDescriptor::new(Method::Delete, url)).await
    }

    pub async fn create_contact(&self, audience_id: &str, contact: NewContact) -> Result<JsonValue> {
        let url = format!("{}/contacts", self.audience_url(audience_id)?);
        validate::email("email", &contact.email)?;
        let body = to_json(&contact)?;
        self.run(RequestDescriptor::new(Method::Post, url).with_json(body))
            .await
    }

    pub async fn list_contacts(&self, audience_id: &str) -> Result<JsonValue> {
        let url = format!("{}/contacts", self.audience_url(audience_id)?);
        self.run(RequestDescriptor::new(Method::Get, url)).await
    }

    pub async fn get_contact(&self, audience_id: &str, contact_id: &str) -> Result<JsonValue> {
        let url = self.contact_url(audience_id, contact_id)?;
        self.run(RequestDescriptor::new(Method::Get, url)).await
    }

    pub async fn update_contact(
        &self,
        audience_id: &str,
        contact_id: &str,
        update: ContactUpdate,
    ) -> Result<JsonValue> {
        let url = self.contact_url(audience_id, contact_id)?;
        if let Some(email) = &update.email {
            validate::email("email", email)?;
        }
        let body = to_json(&update)?;
        self.run(RequestDescriptor::new(Method::Put, url).with_json(body))
            .await
    }

    pub async fn delete_contact(&self, audience_id: &str, contact_id: &str) -> Result<JsonValue> {
        let url = self.contact_url(audience_id, contact_id)?;
        self.run(RequestDescriptor::new(Method::Delete, url)).await
    }

    async fn run(&self, descriptor: RequestDescriptor) -> Result<JsonValue> {
        self.executor
            .execute(&descriptor, &self.options.retry)
            .await
            .map_err(MailError::from)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn audience_url(&self, audience_id: &str) -> Result<String> {
        let id = validate::path_id("audience_id", audience_id)?;
        Ok(self.url(&format!("/audiences/{id}")))
    }

    fn contact_url(&self, audience_id: &str, contact_id: &str) -> Result<String> {
        let audience = self.audience_url(audience_id)?;
        let id = validate::path_id("contact_id", contact_id)?;
        Ok(format!("{audience}/contacts/{id}"))
    }
}

fn validate_send_email(email: &SendEmail) -> Result<()> {
    validate::email("from", &email.from)?;
    if email.recipients.is_empty() {
        return Err(MailError::validation(
            ErrorCode::MissingField,
            "recipients must contain at least one address",
        ));
    }
    for recipient in &email.recipients {
        validate::email("recipient", recipient)?;
    }
    validate::required("subject", &email.subject)?;
    validate::required("content", &email.content)?;
    if let Some(audience_id) = &email.audience_id {
        validate::path_id("audience_id", audience_id)?;
    }
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<JsonValue> {
    serde_json::to_value(value).map_err(|err| {
        MailError::unexpected(format!("failed to serialize request body: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::{validate_send_email, MailClient};
    use crate::{error::ErrorCode, ClientOptions, RetryPolicy, SendEmail};

    #[test]
    fn debug_redacts_api_key() {
        let client = MailClient::new("https://api.example.com", "secret-key");
        let debug = format!("{client:?}");
        assert!(debug.contains("<redacted>"));
        assert!(!debug.contains("secret-key"));
    }

    #[test]
    fn base_url_trailing_slashes_are_trimmed() {
        let client = MailClient::new(" https://api.example.com/v1// ", "k");
        assert_eq!(client.base_url(), "https://api.example.com/v1");
        assert_eq!(client.url("/emails"), "https://api.example.com/v1/emails");
    }

    #[test]
    fn contact_url_encodes_segments() {
        let client = MailClient::new("https://api", "k");
        assert_eq!(
            client.contact_url("aud 1", "c/2").expect("valid ids"),
            "https://api/audiences/aud%201/contacts/c%2F2"
        );
        assert!(client.contact_url("aud", " ").is_err());
    }

    #[test]
    fn with_options_replaces_options() {
        let opts = ClientOptions {
            timeout_ms: 500,
            retry: RetryPolicy::new(5, 10),
        };
        let client = MailClient::new("https://api", "k").with_options(opts.clone());
        assert_eq!(client.options(), &opts);
    }

    #[test]
    fn send_email_validation_rules() {
        let ok = SendEmail::new("a@x.com", ["b@y.com"], "s", "c");
        assert!(validate_send_email(&ok).is_ok());

        let cases = [
            (
                SendEmail {
                    from: "not-an-email".to_owned(),
                    ..ok.clone()
                },
                ErrorCode::InvalidEmail,
            ),
            (
                SendEmail {
                    recipients: vec![],
                    ..ok.clone()
                },
                ErrorCode::MissingField,
            ),
            (
                SendEmail {
                    recipients: vec!["b@y.com".to_owned(), "broken".to_owned()],
                    ..ok.clone()
                },
                ErrorCode::InvalidEmail,
            ),
            (
                SendEmail {
                    subject: " ".to_owned(),
                    ..ok.clone()
                },
                ErrorCode::MissingField,
            ),
            (
                SendEmail {
                    content: String::new(),
                    ..ok.clone()
                },
                ErrorCode::MissingField,
            ),
            (ok.clone().add_to_audience(""), ErrorCode::InvalidArgument),
        ];
        for (email, code) in cases {
            let err = validate_send_email(&email).expect_err("must fail");
            assert!(err.is_validation());
            assert_eq!(err.code(), code);
        }
    }
}
