use serde::Serialize;

use crate::{ContactFields, ProcessedAttachment};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailPayload<'a> {
    pub from: &'a str,
    pub recipients: &'a [String],
    pub subject: &'a str,
    pub content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_contact: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_fields: Option<&'a ContactFields>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tracking_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<ProcessedAttachment>>,
}

#[derive(Debug, Serialize)]
pub struct AudiencePayload<'a> {
    pub name: &'a str,
}
