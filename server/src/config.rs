use std::sync::Arc;

use formrelay::config::Settings;
use formrelay::forms::APPLY_FILE_FIELDS;
use formrelay::mailer::{Mailer, SmtpMailer};
use formrelay::UploadError;

/// Per-file upload limit
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Limit for a single scalar field, and for a whole non-multipart body
pub const MAX_FIELD_SIZE: u64 = 1024 * 1024;

/// Limit for a whole partner form; the form takes any number of files
pub const MAX_PARTNER_FORM_SIZE: u64 = 32 * MAX_FILE_SIZE;

/// Shared, read-only state handed to every route
pub struct Context {
    pub settings: Settings,
    pub mailer: Arc<dyn Mailer>,
}

impl Context {
    pub fn new(settings: Settings) -> Self {
        let mailer = Arc::new(SmtpMailer::new(settings.smtp()));
        Self::with_mailer(settings, mailer)
    }

    pub fn with_mailer(settings: Settings, mailer: Arc<dyn Mailer>) -> Self {
        Self { settings, mailer }
    }
}

/// Which multipart fields may carry files
#[derive(Clone, Debug)]
pub enum FileFields {
    Any,
    /// Field name and maximum file count
    Only(&'static [(&'static str, usize)]),
}

/// Upload rules for one endpoint
#[derive(Clone, Debug)]
pub struct UploadPolicy {
    pub files: FileFields,
    pub max_file_size: u64,
    pub max_form_size: u64,
}

impl UploadPolicy {
    /// Files under any field name
    pub fn partner() -> Self {
        Self {
            files: FileFields::Any,
            max_file_size: MAX_FILE_SIZE,
            max_form_size: MAX_PARTNER_FORM_SIZE,
        }
    }

    /// Files only under the apply form's file fields
    pub fn apply() -> Self {
        let max_files: usize = APPLY_FILE_FIELDS.iter().map(|(_, n)| n).sum();

        Self {
            files: FileFields::Only(APPLY_FILE_FIELDS),
            max_file_size: MAX_FILE_SIZE,
            max_form_size: max_files as u64 * MAX_FILE_SIZE + MAX_FIELD_SIZE,
        }
    }

    /// Checks whether one more file may arrive under `field`, given how
    /// many that field has already received.
    pub fn admit(&self, field: &str, received: usize) -> Result<(), UploadError> {
        match self.files {
            FileFields::Any => Ok(()),
            FileFields::Only(fields) => match fields.iter().find(|(name, _)| *name == field) {
                None => Err(UploadError::UnexpectedField(field.to_string())),
                Some((_, limit)) if received >= *limit => Err(UploadError::TooManyFiles {
                    field: field.to_string(),
                    limit: *limit,
                }),
                Some(_) => Ok(()),
            },
        }
    }
}
