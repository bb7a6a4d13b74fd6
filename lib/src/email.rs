/// Generic outbound message and attachment types.
/// Request-side types (`UploadedFile`) are converted `Into` these
/// before being handed to a transport.
use bytes::Bytes;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A file received as part of a form submission, held in memory only
#[derive(Clone, Debug, Default)]
pub struct UploadedFile {
    /// Form field the file arrived under
    pub field: String,
    pub original_name: String,
    pub mime_type: Option<String>,
    pub content: Bytes,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.content.len()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Attachment {
    pub filename: String,
    pub content: Bytes,
    pub content_type: String,
}

impl From<UploadedFile> for Attachment {
    fn from(file: UploadedFile) -> Self {
        let content_type = file
            .mime_type
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        Self {
            filename: file.original_name,
            content: file.content,
            content_type,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
    pub attachments: Vec<Attachment>,
}
