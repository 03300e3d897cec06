use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::AttachmentInput;

/// Free-form contact attributes.
pub type ContactFields = serde_json::Map<String, JsonValue>;

/// Input for [`MailClient::send_email`](crate::MailClient::send_email).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SendEmail {
    pub from: String,
    pub recipients: Vec<String>,
    pub subject: String,
    pub content: String,
    /// Also create a contact for every recipient.
    pub create_contact: Option<bool>,
    pub audience_id: Option<String>,
    pub contact_fields: Option<ContactFields>,
    pub tracking_id: Option<String>,
    pub attachments: Vec<AttachmentInput>,
}

impl SendEmail {
    pub fn new<I, S>(
        from: impl Into<String>,
        recipients: I,
        subject: impl Into<String>,
        content: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            from: from.into(),
            recipients: recipients.into_iter().map(Into::into).collect(),
            subject: subject.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_attachment(mut self, attachment: AttachmentInput) -> Self {
        self.attachments.push(attachment);
        self
    }

    pub fn with_tracking_id(mut self, tracking_id: impl Into<String>) -> Self {
        self.tracking_id = Some(tracking_id.into());
        self
    }

    /// Creates contacts for the recipients inside `audience_id`.
    pub fn add_to_audience(mut self, audience_id: impl Into<String>) -> Self {
        self.create_contact = Some(true);
        self.audience_id = Some(audience_id.into());
        self
    }

    pub fn with_contact_fields(mut self, fields: ContactFields) -> Self {
        self.contact_fields = Some(fields);
        self
    }
}

/// Input for [`MailClient::create_contact`](crate::MailClient::create_contact).
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ContactFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsubscribed: Option<bool>,
}

impl NewContact {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }
}

/// Partial contact update; absent fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<ContactFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unsubscribed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{AttachmentInput, ContactUpdate, NewContact, SendEmail};

    #[test]
    fn send_email_builder() {
        let email = SendEmail::new("a@x.com", ["b@y.com", "c@y.com"], "s", "c")
            .add_to_audience("aud_1")
            .with_tracking_id("t-1")
            .with_attachment(AttachmentInput::text("a.txt", "Zm9v"));
        assert_eq!(email.recipients, ["b@y.com", "c@y.com"]);
        assert_eq!(email.create_contact, Some(true));
        assert_eq!(email.audience_id.as_deref(), Some("aud_1"));
        assert_eq!(email.attachments.len(), 1);
    }

    #[test]
    fn contact_payloads_skip_absent_fields() {
        let contact = NewContact {
            first_name: Some("Kit".to_owned()),
            ..NewContact::new("kit@x.com")
        };
        assert_eq!(
            serde_json::to_value(&contact).expect("serialize"),
            json!({"email": "kit@x.com", "firstName": "Kit"})
        );
        assert_eq!(
            serde_json::to_value(ContactUpdate::default()).expect("serialize"),
            json!({})
        );
    }
}
