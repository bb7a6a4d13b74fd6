use std::convert::Infallible;

use warp::{http::StatusCode, Rejection, Reply};

use formrelay::api::ServerResult;
use formrelay::UploadError;

/// Wrap the shared formrelay error type so Reject can be impl'd
#[derive(Debug)]
pub struct Error(pub formrelay::Error);

impl warp::reject::Reject for Error {}

impl From<formrelay::Error> for Error {
    fn from(err: formrelay::Error) -> Self {
        Self(err)
    }
}

impl From<UploadError> for Error {
    fn from(err: UploadError) -> Self {
        Self(err.into())
    }
}

/// Rejects a request with a formrelay error
pub fn reject(err: impl Into<Error>) -> Rejection {
    warp::reject::custom(err.into())
}

/// Maps rejections to HTTP status codes.
///
/// Every error reply is `{ok: false, error}`.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let status_code;
    let message;

    if let Some(Error(e)) = err.find::<Error>() {
        status_code = match e {
            formrelay::Error::UploadRejected(UploadError::FileTooLarge { .. })
            | formrelay::Error::UploadRejected(UploadError::BodyTooLarge(_)) => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            formrelay::Error::UploadRejected(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        log::warn!("Upload rejected: {}", e);
        message = e.to_string();
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        status_code = StatusCode::PAYLOAD_TOO_LARGE;
        message = "Request body too large".to_string();
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        status_code = StatusCode::LENGTH_REQUIRED;
        message = "Content-Length required".to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        status_code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method not allowed".to_string();
    } else if err.is_not_found() {
        status_code = StatusCode::NOT_FOUND;
        message = "Not found".to_string();
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        status_code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal server error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&ServerResult::failed(message)),
        status_code,
    ))
}
