//! Send-email body strategies.
//!
//! The strategy is picked once per call from the probed environment, so the
//! rest of the call path never branches on it.

use reqwest::multipart::Part;

use crate::{
    attachment,
    error::ErrorCode,
    transport::{FilePart, MultipartBody, RequestBody},
    wire::SendEmailPayload,
    AttachmentInput, Environment, MailError, Result, SendEmail,
};

/// Field name for file parts in multipart bodies.
pub const FILES_FIELD: &str = "files";

pub(crate) trait PayloadStrategy {
    fn encode(&self, email: SendEmail) -> Result<RequestBody>;
}

/// JSON body with normalized attachments.
pub(crate) struct JsonPayload {
    pub environment: Environment,
}

/// Multipart form with native file handles passed through.
pub(crate) struct MultipartPayload;

/// Multipart only for a browser host whose attachments are all native file handles.
pub(crate) fn select(
    environment: Environment,
    attachments: &[AttachmentInput],
) -> Box<dyn PayloadStrategy> {
    let native_files = !attachments.is_empty()
        && attachments.iter().all(AttachmentInput::is_browser_file);
    if environment.is_browser() && native_files {
        Box::new(MultipartPayload)
    } else {
        Box::new(JsonPayload { environment })
    }
}

impl PayloadStrategy for JsonPayload {
    fn encode(&self, mut email: SendEmail) -> Result<RequestBody> {
        let attachments = std::mem::take(&mut email.attachments);
        let attachments = if attachments.is_empty() {
            None
        } else {
            Some(attachment::normalize(attachments, self.environment)?)
        };

        let payload = SendEmailPayload {
            from: &email.from,
            recipients: &email.recipients,
            subject: &email.subject,
            content: &email.content,
            create_contact: email.create_contact,
            audience_id: email.audience_id.as_deref(),
            contact_fields: email.contact_fields.as_ref(),
            tracking_id: email.tracking_id.as_deref(),
            attachments,
        };
        serde_json::to_value(&payload)
            .map(RequestBody::Json)
            .map_err(serialize_error)
    }
}

impl PayloadStrategy for MultipartPayload {
    fn encode(&self, email: SendEmail) -> Result<RequestBody> {
        // Nothing is encoded before the whole batch has passed size and type checks.
        for file in &email.attachments {
            file.check_size()?;
            check_content_type(file)?;
        }

        let recipients = serde_json::to_string(&email.recipients).map_err(serialize_error)?;
        let mut body = MultipartBody::default()
            .text("from", email.from)
            .text("recipients", recipients)
            .text("subject", email.subject)
            .text("content", email.content);
        if let Some(create_contact) = email.create_contact {
            body = body.text("createContact", create_contact.to_string());
        }
        if let Some(audience_id) = email.audience_id {
            body = body.text("audienceId", audience_id);
        }
        if let Some(fields) = &email.contact_fields {
            body = body.text(
                "contactFields",
                serde_json::to_string(fields).map_err(serialize_error)?,
            );
        }
        if let Some(tracking_id) = email.tracking_id {
            body = body.text("trackingId", tracking_id);
        }

        for file in email.attachments {
            let content_type = file.content_type();
            let (filename, content) = file.into_raw_parts();
            body = body.file(FilePart {
                field: FILES_FIELD.to_owned(),
                filename,
                content_type,
                content,
            });
        }
        Ok(RequestBody::Multipart(body))
    }
}

/// Rejects declared types the multipart encoder could not put on a part.
fn check_content_type(file: &AttachmentInput) -> Result<()> {
    let content_type = file.content_type();
    Part::bytes(Vec::new())
        .mime_str(&content_type)
        .map(|_| ())
        .map_err(|_| {
            MailError::validation(
                ErrorCode::InvalidAttachment,
                format!(
                    "attachment '{}' has an invalid content type '{content_type}'",
                    file.filename()
                ),
            )
        })
}

fn serialize_error(err: serde_json::Error) -> MailError {
    MailError::unexpected(format!("failed to serialize request body: {err}"))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{select, JsonPayload, MultipartPayload, PayloadStrategy, FILES_FIELD};
    use crate::{
        attachment::MAX_ATTACHMENT_SIZE, error::ErrorCode, transport::RequestBody,
        AttachmentInput, Environment, SendEmail,
    };

    fn email() -> SendEmail {
        SendEmail::new("a@x.com", ["b@y.com"], "s", "c")
    }

    #[test]
    fn json_body_without_attachments_omits_optional_fields() {
        let body = JsonPayload {
            environment: Environment::Server,
        }
        .encode(email())
        .expect("must encode");
        assert_eq!(
            body,
            RequestBody::Json(json!({
                "from": "a@x.com",
                "recipients": ["b@y.com"],
                "subject": "s",
                "content": "c"
            }))
        );
    }

    #[test]
    fn json_body_carries_normalized_attachments() {
        let body = JsonPayload {
            environment: Environment::Server,
        }
        .encode(
            email()
                .add_to_audience("aud_1")
                .with_attachment(AttachmentInput::buffer("r.pdf", b"pdf".to_vec())),
        )
        .expect("must encode");
        let RequestBody::Json(json) = body else {
            panic!("expected json body");
        };
        assert_eq!(json["createContact"], json!(true));
        assert_eq!(json["audienceId"], json!("aud_1"));
        assert_eq!(
            json["attachments"],
            json!([{
                "filename": "r.pdf",
                "content": "cGRm",
                "contentType": "application/pdf",
                "encoding": "base64",
                "disposition": "attachment"
            }])
        );
    }

    #[test]
    fn multipart_passes_files_through() {
        let mut fields = serde_json::Map::new();
        fields.insert("plan".to_owned(), json!("pro"));
        let body = MultipartPayload
            .encode(
                email()
                    .with_tracking_id("t-9")
                    .with_contact_fields(fields)
                    .with_attachment(AttachmentInput::browser_file("a.png", vec![1, 2]))
                    .with_attachment(AttachmentInput::browser_file("b.bin", vec![3])),
            )
            .expect("must encode");
        let RequestBody::Multipart(form) = body else {
            panic!("expected multipart body");
        };
        assert_eq!(form.field("recipients"), Some(r#"["b@y.com"]"#));
        assert_eq!(form.field("trackingId"), Some("t-9"));
        assert_eq!(form.field("contactFields"), Some(r#"{"plan":"pro"}"#));
        assert_eq!(form.field("createContact"), None);
        assert_eq!(form.files.len(), 2);
        assert!(form.files.iter().all(|file| file.field == FILES_FIELD));
        assert_eq!(form.files[0].content, vec![1, 2]);
        assert_eq!(form.files[0].content_type, "image/png");
        assert_eq!(form.files[1].content_type, "application/octet-stream");
    }

    #[test]
    fn multipart_enforces_size_limit() {
        let big = AttachmentInput::browser_file("huge.mov", vec![0; MAX_ATTACHMENT_SIZE as usize + 1]);
        let err = MultipartPayload
            .encode(email().with_attachment(big))
            .expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::AttachmentTooLarge);
    }

    #[test]
    fn multipart_rejects_malformed_content_type_before_encoding() {
        let err = MultipartPayload
            .encode(
                email()
                    .with_attachment(AttachmentInput::browser_file("ok.txt", vec![1]))
                    .with_attachment(
                        AttachmentInput::browser_file("a.png", vec![1]).with_content_type("not a mime"),
                    ),
            )
            .expect_err("must fail");
        assert!(err.is_validation());
        assert_eq!(err.code(), ErrorCode::InvalidAttachment);
        assert!(err.to_string().contains("a.png"));
    }

    #[test]
    fn selection_rules() {
        let files = [AttachmentInput::browser_file("a.txt", vec![1])];
        let mixed = [
            AttachmentInput::browser_file("a.txt", vec![1]),
            AttachmentInput::text("b.txt", "Zm9v"),
        ];
        let is_multipart = |environment, attachments: &[AttachmentInput]| {
            matches!(
                select(environment, attachments)
                    .encode(SendEmail {
                        attachments: attachments.to_vec(),
                        ..email()
                    })
                    .expect("must encode"),
                RequestBody::Multipart(_)
            )
        };
        assert!(is_multipart(Environment::Browser, &files));
        assert!(!is_multipart(Environment::Browser, &mixed));
        assert!(!is_multipart(Environment::Browser, &[]));
        assert!(!is_multipart(Environment::Server, &files));
    }
}
