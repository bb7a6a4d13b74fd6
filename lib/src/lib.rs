pub mod api;
pub mod config;
pub mod email;
pub mod error;
pub mod fields;
pub mod forms;
pub mod mailer;
pub mod render;

pub use error::{Error, UploadError};
