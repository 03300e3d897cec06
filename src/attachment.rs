use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

use crate::{error::ErrorCode, mime::content_type_for, Environment, MailError, Result};

/// Maximum raw size of a single attachment, before any encoding (7 MiB).
pub const MAX_ATTACHMENT_SIZE: u64 = 7 * 1024 * 1024;

const MAX_ATTACHMENT_SIZE_LABEL: &str = "7MB";

/// Encoding reported on every processed attachment.
pub const ENCODING_BASE64: &str = "base64";

/// Disposition reported on every processed attachment.
pub const DISPOSITION_ATTACHMENT: &str = "attachment";

/// A file handle obtained from a browser file picker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrowserFile {
    pub name: String,
    /// Size reported by the host.
    pub size: u64,
    pub content: Vec<u8>,
    pub mime_type: Option<String>,
}

/// An uploaded buffer as produced by server-side upload middleware.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerBuffer {
    pub buffer: Vec<u8>,
    pub original_filename: String,
    pub mime_type: Option<String>,
}

/// Content of a [`GenericAttachment`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentBody {
    Bytes(Vec<u8>),
    /// Text forwarded verbatim; expected to be base64 already.
    Text(String),
}

/// A plain content/filename record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenericAttachment {
    pub content: AttachmentBody,
    pub filename: String,
    pub content_type: Option<String>,
}

/// Every attachment shape the client accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentInput {
    BrowserFile(BrowserFile),
    ServerBuffer(ServerBuffer),
    Generic(GenericAttachment),
}

impl AttachmentInput {
    pub fn browser_file(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self::BrowserFile(BrowserFile {
            name: name.into(),
            size: content.len() as u64,
            content,
            mime_type: None,
        })
    }

    pub fn buffer(original_filename: impl Into<String>, buffer: Vec<u8>) -> Self {
        Self::ServerBuffer(ServerBuffer {
            buffer,
            original_filename: original_filename.into(),
            mime_type: None,
        })
    }

    pub fn bytes(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self::Generic(GenericAttachment {
            content: AttachmentBody::Bytes(content),
            filename: filename.into(),
            content_type: None,
        })
    }

    pub fn text(filename: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Generic(GenericAttachment {
            content: AttachmentBody::Text(content.into()),
            filename: filename.into(),
            content_type: None,
        })
    }

    /// Overrides the declared content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = Some(content_type.into());
        match &mut self {
            Self::BrowserFile(file) => file.mime_type = content_type,
            Self::ServerBuffer(buffer) => buffer.mime_type = content_type,
            Self::Generic(generic) => generic.content_type = content_type,
        }
        self
    }

    /// Classifies an untyped record.
    ///
    /// Shapes are tried in order: browser file (`name`, `size`, `data`),
    /// server buffer (`buffer`, `originalname`), generic (`content`, `filename`).
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        let invalid = || {
            MailError::validation(ErrorCode::InvalidAttachment, "invalid attachment format")
        };
        let record = value.as_object().ok_or_else(invalid)?;
        let text = |key: &str| record.get(key).and_then(JsonValue::as_str);

        if let (Some(name), Some(size), Some(content)) = (
            text("name"),
            record.get("size").and_then(JsonValue::as_u64),
            record.get("data").and_then(json_bytes),
        ) {
            return Ok(Self::BrowserFile(BrowserFile {
                name: name.to_owned(),
                size,
                content,
                mime_type: text("type").map(str::to_owned),
            }));
        }

        if let (Some(buffer), Some(original_filename)) = (
            record.get("buffer").and_then(json_bytes),
            text("originalname"),
        ) {
            return Ok(Self::ServerBuffer(ServerBuffer {
                buffer,
                original_filename: original_filename.to_owned(),
                mime_type: text("mimetype").map(str::to_owned),
            }));
        }

        if let (Some(content), Some(filename)) = (record.get("content"), text("filename")) {
            let content = match content {
                JsonValue::String(text) => AttachmentBody::Text(text.clone()),
                other => AttachmentBody::Bytes(json_bytes(other).ok_or_else(invalid)?),
            };
            return Ok(Self::Generic(GenericAttachment {
                content,
                filename: filename.to_owned(),
                content_type: text("contentType").map(str::to_owned),
            }));
        }

        Err(invalid())
    }

    pub fn filename(&self) -> &str {
        match self {
            Self::BrowserFile(file) => &file.name,
            Self::ServerBuffer(buffer) => &buffer.original_filename,
            Self::Generic(generic) => &generic.filename,
        }
    }

    /// Raw byte length before any encoding. Text counts its UTF-8 bytes.
    pub fn byte_len(&self) -> u64 {
        match self {
            // Trust whichever of the host-reported size and the payload is larger.
            Self::BrowserFile(file) => file.size.max(file.content.len() as u64),
            Self::ServerBuffer(buffer) => buffer.buffer.len() as u64,
            Self::Generic(GenericAttachment { content, .. }) => match content {
                AttachmentBody::Bytes(bytes) => bytes.len() as u64,
                AttachmentBody::Text(text) => text.len() as u64,
            },
        }
    }

    /// Declared content type, or one derived from the filename extension.
    pub fn content_type(&self) -> String {
        let declared = match self {
            Self::BrowserFile(file) => file.mime_type.as_deref(),
            Self::ServerBuffer(buffer) => buffer.mime_type.as_deref(),
            Self::Generic(generic) => generic.content_type.as_deref(),
        };
        declared
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| content_type_for(self.filename()))
            .to_owned()
    }

    pub fn is_browser_file(&self) -> bool {
        matches!(self, Self::BrowserFile(_))
    }

    /// Fails when the attachment exceeds [`MAX_ATTACHMENT_SIZE`].
    pub fn check_size(&self) -> Result<()> {
        if self.byte_len() > MAX_ATTACHMENT_SIZE {
            return Err(MailError::validation(
                ErrorCode::AttachmentTooLarge,
                format!(
                    "attachment '{}' exceeds the maximum size of {MAX_ATTACHMENT_SIZE_LABEL}",
                    self.filename()
                ),
            ));
        }
        Ok(())
    }

    pub(crate) fn into_raw_parts(self) -> (String, Vec<u8>) {
        match self {
            Self::BrowserFile(file) => (file.name, file.content),
            Self::ServerBuffer(buffer) => (buffer.original_filename, buffer.buffer),
            Self::Generic(generic) => match generic.content {
                AttachmentBody::Bytes(bytes) => (generic.filename, bytes),
                AttachmentBody::Text(text) => (generic.filename, text.into_bytes()),
            },
        }
    }
}

/// Content of a [`ProcessedAttachment`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttachmentContent {
    /// Raw bytes; base64-encoded when serialized.
    Bytes(Vec<u8>),
    /// Already base64 text.
    Base64(String),
}

impl AttachmentContent {
    pub fn to_base64(&self) -> String {
        match self {
            Self::Bytes(bytes) => STANDARD.encode(bytes),
            Self::Base64(text) => text.clone(),
        }
    }
}

impl Serialize for AttachmentContent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Bytes(bytes) => serializer.serialize_str(&STANDARD.encode(bytes)),
            Self::Base64(text) => serializer.serialize_str(text),
        }
    }
}

/// Wire-ready attachment record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedAttachment {
    pub filename: String,
    pub content: AttachmentContent,
    pub content_type: String,
    pub encoding: String,
    pub disposition: String,
}

/// Normalizes a batch. Fails on the first oversized item; output order matches input.
pub fn normalize<I>(items: I, environment: Environment) -> Result<Vec<ProcessedAttachment>>
where
    I: IntoIterator<Item = AttachmentInput>,
{
    items
        .into_iter()
        .map(|item| process(item, environment))
        .collect()
}

/// Classifies every untyped record, then normalizes the batch.
pub fn normalize_json(
    items: &[JsonValue],
    environment: Environment,
) -> Result<Vec<ProcessedAttachment>> {
    let inputs = items
        .iter()
        .enumerate()
        .map(|(index, value)| {
            AttachmentInput::from_json(value).map_err(|_| {
                MailError::validation(
                    ErrorCode::InvalidAttachment,
                    format!("invalid attachment format at index {index}"),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;
    normalize(inputs, environment)
}

fn process(item: AttachmentInput, environment: Environment) -> Result<ProcessedAttachment> {
    item.check_size()?;
    let content_type = item.content_type();
    let (filename, content) = match item {
        AttachmentInput::Generic(GenericAttachment {
            content: AttachmentBody::Text(text),
            filename,
            ..
        }) => (filename, AttachmentContent::Base64(text)),
        binary => {
            let (filename, bytes) = binary.into_raw_parts();
            let content = match environment {
                Environment::Browser => AttachmentContent::Base64(STANDARD.encode(&bytes)),
                Environment::Server => AttachmentContent::Bytes(bytes),
            };
            (filename, content)
        }
    };

    Ok(ProcessedAttachment {
        filename,
        content,
        content_type,
        encoding: ENCODING_BASE64.to_owned(),
        disposition: DISPOSITION_ATTACHMENT.to_owned(),
    })
}

/// Accepts a byte array or a serialized Node `Buffer` (`{"type":"Buffer","data":[..]}`).
fn json_bytes(value: &JsonValue) -> Option<Vec<u8>> {
    match value {
        JsonValue::Array(items) => items
            .iter()
            .map(|item| item.as_u64().and_then(|byte| u8::try_from(byte).ok()))
            .collect(),
        JsonValue::Object(record) if record.get("type")?.as_str()? == "Buffer" => {
            json_bytes(record.get("data")?)
        }
        _ => None,
    }
}
