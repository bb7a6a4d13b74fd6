use std::sync::Arc;

use warp::{Filter, Rejection, reply::Reply};

use super::config::{Context, UploadPolicy};
use super::controllers;
use super::error;
use super::filters;

/// Route for GET /api/health
pub fn health() -> impl Filter<Extract = (impl Reply, ), Error = Rejection> + Clone {
    warp::path!("api" / "health")
         .and(warp::get())
         .and_then(controllers::health)
}

/// Route for POST /api/partner
/// Files are accepted under any field name
pub fn partner(ctx: Arc<Context>) -> impl Filter<Extract = (impl Reply, ), Error = Rejection> + Clone {
    let trust_proxy = ctx.settings.trust_proxy();

    warp::path!("api" / "partner")
         .and(warp::post())
         .and(filters::with_context(ctx))
         .and(filters::client_ip(trust_proxy))
         .and(filters::submission(UploadPolicy::partner()))
         .and_then(controllers::partner)
}

/// Route for POST /api/apply
/// Files are accepted only under the apply form's file fields
pub fn apply(ctx: Arc<Context>) -> impl Filter<Extract = (impl Reply, ), Error = Rejection> + Clone {
    let trust_proxy = ctx.settings.trust_proxy();

    warp::path!("api" / "apply")
         .and(warp::post())
         .and(filters::with_context(ctx))
         .and(filters::client_ip(trust_proxy))
         .and(filters::submission(UploadPolicy::apply()))
         .and_then(controllers::apply)
}

/// All routes, with error recovery and CORS for any origin
pub fn router(ctx: Arc<Context>) -> impl Filter<Extract = (impl Reply, ), Error = Rejection> + Clone {
    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["GET", "POST", "OPTIONS"])
        .allow_headers(vec!["content-type"]);

    health()
        .or(partner(ctx.clone()))
        .or(apply(ctx))
        .recover(error::handle_rejection)
        .with(cors)
}
