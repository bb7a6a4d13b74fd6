use std::net::SocketAddr;
use std::sync::Arc;

use super::config::Context;
use super::routes;

/// Serves all routes until Ctrl-C
pub async fn run(addr: SocketAddr, ctx: Arc<Context>) -> Result<(), warp::Error> {
    let router = routes::router(ctx);

    let (addr, server) = warp::serve(router).try_bind_with_graceful_shutdown(addr, async {
        tokio::signal::ctrl_c().await.ok();
        log::info!("Shutting down...");
    })?;

    log::info!("Server listening on http://{}", addr);

    server.await;

    Ok(())
}
