//! Turns the two website forms into outbound messages.
//!
//! "Partner With Us" has a fixed field set and accepts files under any
//! field name. "Apply Now" passes its whole body through and only takes
//! files under the four [`APPLY_FILE_FIELDS`].
use chrono::{DateTime, SecondsFormat, Utc};

use crate::config::Settings;
use crate::email::{Attachment, MailMessage, UploadedFile};
use crate::fields::{FieldMap, FieldValue};
use crate::render::render_html;

pub const PARTNER_FORM: &str = "Partner With Us";
pub const APPLY_FORM: &str = "Apply Now";

/// Accepted file fields for the apply form with their maximum file counts,
/// in the order their files are attached.
pub const APPLY_FILE_FIELDS: &[(&str, usize)] = &[
    ("pitch_deck", 10),
    ("dpiit_certificate", 10),
    ("ip_files", 20),
    ("balance_sheets", 10),
];

const PARTNER_FIELDS: &[&str] = &["name", "email", "organisation", "enquiry"];

/// A parsed request body
#[derive(Clone, Debug, Default)]
pub struct Submission {
    pub fields: FieldMap,
    pub files: Vec<UploadedFile>,
}

/// Request details recorded alongside the submitted fields
#[derive(Clone, Debug)]
pub struct RequestInfo {
    pub ip: String,
    pub received_at: DateTime<Utc>,
}

impl RequestInfo {
    pub fn new(ip: Option<String>) -> Self {
        Self {
            ip: ip.unwrap_or_default(),
            received_at: Utc::now(),
        }
    }

    /// ISO-8601 with millisecond precision, e.g. `2024-05-01T09:30:00.000Z`
    pub fn timestamp(&self) -> String {
        self.received_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

pub fn partner_subject(body: &FieldMap) -> String {
    let who = body
        .get_text("name")
        .or_else(|| body.get_text("organisation"))
        .or_else(|| body.get_text("email"))
        .unwrap_or_else(|| "Unknown".to_string());

    format!("Partner enquiry from {}", who)
}

pub fn partner_fields(body: &FieldMap, info: &RequestInfo) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("form", PARTNER_FORM);

    for key in PARTNER_FIELDS {
        let value = body.get(key).cloned().unwrap_or_else(|| FieldValue::from(""));
        fields.insert(*key, value);
    }

    fields.insert("submitted_at", info.timestamp());
    fields.insert("ip", info.ip.as_str());
    fields
}

pub fn partner_message(submission: Submission, info: &RequestInfo, settings: &Settings) -> MailMessage {
    let fields = partner_fields(&submission.fields, info);

    MailMessage {
        from: settings.sender(),
        to: settings.recipient(),
        subject: partner_subject(&submission.fields),
        html: render_html(&fields),
        attachments: submission.files.into_iter().map(Attachment::from).collect(),
    }
}

pub fn apply_subject(body: &FieldMap) -> String {
    if let Some(subject) = body.get_text("subject") {
        return subject;
    }

    // Only a scalar "startup" (or no mode at all) counts as a startup
    let startup = match body.get("mode").filter(|v| is_present(v)) {
        None => true,
        Some(mode) => mode.as_str() == Some("startup"),
    };

    if startup {
        let name = body
            .get_text("startupName")
            .or_else(|| body.get_text("organisation"))
            .unwrap_or_default();
        format!("Application: {}", name)
    } else {
        "Application: Individual".to_string()
    }
}

fn is_present(value: &FieldValue) -> bool {
    match value {
        FieldValue::Text(s) => !s.is_empty(),
        FieldValue::List(_) => true,
    }
}

pub fn apply_fields(body: &FieldMap, info: &RequestInfo) -> FieldMap {
    let mut fields = body.clone();
    fields.insert("form", APPLY_FORM);

    let submitted_at = body
        .get("submitted_at")
        .filter(|v| is_present(v))
        .cloned()
        .unwrap_or_else(|| FieldValue::Text(info.timestamp()));
    fields.insert("submitted_at", submitted_at);
    fields.insert("ip", info.ip.as_str());
    fields
}

/// Orders files by [`APPLY_FILE_FIELDS`]; files under any other field keep
/// their arrival order at the end.
pub fn apply_attachments(files: Vec<UploadedFile>) -> Vec<Attachment> {
    let rank = |file: &UploadedFile| {
        APPLY_FILE_FIELDS
            .iter()
            .position(|(name, _)| *name == file.field)
            .unwrap_or(APPLY_FILE_FIELDS.len())
    };

    let mut files = files;
    // Stable sort keeps arrival order within a field
    files.sort_by_key(rank);
    files.into_iter().map(Attachment::from).collect()
}

pub fn apply_message(submission: Submission, info: &RequestInfo, settings: &Settings) -> MailMessage {
    let fields = apply_fields(&submission.fields, info);

    MailMessage {
        from: settings.sender(),
        to: settings.recipient(),
        subject: apply_subject(&submission.fields),
        html: render_html(&fields),
        attachments: apply_attachments(submission.files),
    }
}
