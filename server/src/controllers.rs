use std::convert::Infallible;
use std::sync::Arc;

use warp::{http::StatusCode, reply::Reply};

use formrelay::api::ServerResult;
use formrelay::email::MailMessage;
use formrelay::forms::{self, RequestInfo, Submission};
use formrelay::mailer::Mailer;
use formrelay::Error;

use super::config::Context;

/// Builds the transport first so that missing SMTP settings fail the
/// request before any attachment is processed.
async fn dispatch(
    mailer: &dyn Mailer,
    build: impl FnOnce() -> MailMessage,
) -> Result<String, Error> {
    let transport = mailer.transport()?;
    let message = build();

    log::info!(
        "Sending \"{}\" to {} with {} attachments",
        message.subject,
        message.to,
        message.attachments.len()
    );

    transport.send(message).await
}

fn respond(result: Result<String, Error>, tag: &str) -> impl Reply {
    match result {
        Ok(id) => {
            log::info!("Sent message {}", id);
            warp::reply::with_status(warp::reply::json(&ServerResult::sent(id)), StatusCode::OK)
        }
        Err(e) => {
            log::error!("{}: {}", tag, e);
            warp::reply::with_status(
                warp::reply::json(&ServerResult::failed(e)),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        }
    }
}

pub async fn health() -> Result<impl Reply, Infallible> {
    Ok(warp::reply::json(&ServerResult::healthy()))
}

/// Handles the "Partner With Us" form
pub async fn partner(
    ctx: Arc<Context>,
    ip: Option<String>,
    submission: Submission,
) -> Result<impl Reply, Infallible> {
    let info = RequestInfo::new(ip);

    let result = dispatch(ctx.mailer.as_ref(), || {
        forms::partner_message(submission, &info, &ctx.settings)
    })
    .await;

    Ok(respond(result, "PARTNER SEND ERROR"))
}

/// Handles the "Apply Now" form
pub async fn apply(
    ctx: Arc<Context>,
    ip: Option<String>,
    submission: Submission,
) -> Result<impl Reply, Infallible> {
    let info = RequestInfo::new(ip);

    let result = dispatch(ctx.mailer.as_ref(), || {
        forms::apply_message(submission, &info, &ctx.settings)
    })
    .await;

    Ok(respond(result, "APPLY SEND ERROR"))
}
