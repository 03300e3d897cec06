//! `mailwire-http` is an async HTTP client for a hosted email, contact and
//! audience API.
//!
//! Every operation validates its input before touching the network, runs
//! through a bounded retry loop with exponential backoff and jitter, and
//! reports failures as a single [`MailError`]:
//! - [`MailClient::send_email`]
//! - [`MailClient::send_template_email`]
//! - audience and contact CRUD on [`MailClient`]
//!
//! Attachments of any supported shape are normalized by
//! [`attachment::normalize`] before they are serialized.

pub mod attachment;
mod client;
mod environment;
mod error;
mod executor;
pub mod mime;
mod options;
mod payload;
mod template;
mod transport;
mod types;
mod validate;
mod wire;

pub use attachment::{
    AttachmentBody, AttachmentContent, AttachmentInput, BrowserFile, GenericAttachment,
    ProcessedAttachment, ServerBuffer, MAX_ATTACHMENT_SIZE,
};
pub use client::MailClient;
pub use environment::{Capabilities, Environment};
pub use error::{ErrorCode, HttpFailure, MailError};
pub use executor::{backoff_delay, RequestExecutor, SharedTransport, API_KEY_HEADER};
pub use options::{ClientOptions, RetryPolicy};
pub use payload::FILES_FIELD;
pub use template::{render as render_template, TemplateVars};
pub use transport::{
    FilePart, Headers, Method, MultipartBody, RequestBody, RequestDescriptor, ReqwestTransport,
    Transport, TransportResult,
};
pub use types::{ContactFields, ContactUpdate, NewContact, SendEmail};
pub use validate::is_valid_email;

pub type Result<T> = std::result::Result<T, MailError>;
