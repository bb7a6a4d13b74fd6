use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes};
use futures::{pin_mut, Stream, TryStreamExt};
use warp::multipart::{FormData, Part};
use warp::{filters::BoxedFilter, Filter, Rejection};

use formrelay::email::UploadedFile;
use formrelay::fields::FieldMap;
use formrelay::forms::Submission;
use formrelay::UploadError;

use super::config::{Context, UploadPolicy, MAX_FIELD_SIZE};
use super::error::reject;

/// Injects the shared context into a route
pub fn with_context(ctx: Arc<Context>) -> BoxedFilter<(Arc<Context>,)> {
    warp::any().map(move || ctx.clone()).boxed()
}

/// Client IP as seen by the server.
///
/// With `trust_proxy` set, the first `X-Forwarded-For` entry wins over the
/// socket address.
pub fn client_ip(trust_proxy: bool) -> BoxedFilter<(Option<String>,)> {
    warp::addr::remote()
        .and(warp::header::optional::<String>("x-forwarded-for"))
        .map(move |addr: Option<SocketAddr>, forwarded: Option<String>| {
            let forwarded = forwarded
                .filter(|_| trust_proxy)
                .and_then(|f| f.split(',').next().map(|s| s.trim().to_string()))
                .filter(|s| !s.is_empty());

            forwarded.or_else(|| addr.map(|a| a.ip().to_string()))
        })
        .boxed()
}

fn is_multipart(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.trim().to_ascii_lowercase().starts_with("multipart/form-data"))
        .unwrap_or(false)
}

/// Passes only when the request is (or is not) `multipart/form-data`,
/// without touching the body
fn multipart(expected: bool) -> BoxedFilter<()> {
    warp::header::optional::<String>("content-type")
        .and_then(move |content_type: Option<String>| async move {
            if is_multipart(content_type.as_deref()) == expected {
                Ok(())
            } else {
                Err(warp::reject::not_found())
            }
        })
        .untuple_one()
        .boxed()
}

/// Parses the request body into fields and in-memory files.
///
/// Multipart bodies are checked against `policy`; other bodies may carry
/// urlencoded or JSON fields, but no files.
pub fn submission(policy: UploadPolicy) -> BoxedFilter<(Submission,)> {
    let form = multipart(true)
        .and(warp::multipart::form().max_length(policy.max_form_size))
        .and_then(move |form: FormData| read_form(form, policy.clone()));

    let plain = multipart(false)
        .and(warp::header::optional::<String>("content-type"))
        .and(warp::body::stream())
        .and_then(|content_type: Option<String>, body| async move {
            let body = read_stream(body, MAX_FIELD_SIZE)
                .await
                .map_err(|e| reject(e.into_upload_error(UploadError::BodyTooLarge(MAX_FIELD_SIZE))))?;
            read_body(content_type.as_deref(), &body)
        });

    form.or(plain).unify().boxed()
}

async fn read_form(form: FormData, policy: UploadPolicy) -> Result<Submission, Rejection> {
    let mut submission = Submission::default();
    let mut received: HashMap<String, usize> = HashMap::new();

    pin_mut!(form);
    while let Some(part) = form
        .try_next()
        .await
        .map_err(|e| reject(UploadError::Malformed(e.to_string())))?
    {
        let field = part.name().to_string();

        match part.filename().map(String::from) {
            Some(original_name) => {
                let count = received.entry(field.clone()).or_insert(0);
                policy.admit(&field, *count).map_err(reject)?;
                *count += 1;

                let mime_type = part.content_type().map(String::from);
                let content = read_part(part, policy.max_file_size).await.map_err(|e| {
                    reject(e.into_upload_error(UploadError::FileTooLarge {
                        field: field.clone(),
                        limit: policy.max_file_size,
                    }))
                })?;

                let file = UploadedFile {
                    field,
                    original_name,
                    mime_type,
                    content,
                };
                log::debug!("Received file {} ({} bytes) in {}", file.original_name, file.size(), file.field);
                submission.files.push(file);
            }
            None => {
                let value = read_part(part, MAX_FIELD_SIZE)
                    .await
                    .map_err(|e| reject(e.into_upload_error(UploadError::BodyTooLarge(MAX_FIELD_SIZE))))?;
                submission
                    .fields
                    .append(&field, String::from_utf8_lossy(&value).into_owned());
            }
        }
    }

    log::debug!(
        "Parsed form with {} fields and {} files",
        submission.fields.len(),
        submission.files.len()
    );

    Ok(submission)
}

/// Reasons a body stream could not be buffered
#[derive(Debug)]
enum ReadError {
    TooLarge,
    Stream(warp::Error),
}

impl ReadError {
    fn into_upload_error(self, too_large: UploadError) -> UploadError {
        match self {
            Self::TooLarge => too_large,
            Self::Stream(e) => UploadError::Malformed(e.to_string()),
        }
    }
}

async fn read_part(part: Part, limit: u64) -> Result<Bytes, ReadError> {
    read_stream(part.stream(), limit).await
}

/// Buffers a body stream in memory, giving up once it exceeds `limit`
async fn read_stream<S, B>(stream: S, limit: u64) -> Result<Bytes, ReadError>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    pin_mut!(stream);

    let mut data = Vec::new();
    while let Some(chunk) = stream.try_next().await.map_err(ReadError::Stream)? {
        if (data.len() + chunk.remaining()) as u64 > limit {
            return Err(ReadError::TooLarge);
        }
        data.put(chunk);
    }

    Ok(Bytes::from(data))
}

fn read_body(content_type: Option<&str>, body: &[u8]) -> Result<Submission, Rejection> {
    let content_type = content_type.unwrap_or("").to_ascii_lowercase();

    let fields = if body.is_empty() {
        FieldMap::new()
    } else if content_type.starts_with("application/json") {
        FieldMap::from_json(body).map_err(reject)?
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        FieldMap::from_urlencoded(body)
    } else {
        // Unknown bodies carry no fields
        FieldMap::new()
    };

    Ok(Submission {
        fields,
        files: Vec::new(),
    })
}
