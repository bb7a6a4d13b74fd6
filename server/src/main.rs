use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;

use formrelay::config::Settings;

mod config;
mod controllers;
mod error;
mod filters;
mod http;
mod routes;

#[derive(Debug, Parser)]
#[command(
    name = "formrelay",
    about = "Relays website form submissions as email over SMTP."
)]
struct Opt {
    /// Optional TOML config file; environment variables take precedence
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind to (overrides BIND_ADDR)
    #[arg(short, long)]
    bind: Option<IpAddr>,
}

#[tokio::main]
async fn main() {
    // Load .env before the logger so RUST_LOG can live there too
    let dotenv = dotenvy::dotenv();

    env_logger::builder().format_timestamp_micros().init();

    if let Err(e) = dotenv {
        if !e.not_found() {
            log::warn!("Failed to load .env: {}", e);
        }
    }

    let opt = Opt::parse();

    let settings = match Settings::load(opt.config.as_deref()) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    let ip = match opt.bind {
        Some(ip) => ip,
        None => match settings.bind_addr() {
            Ok(ip) => ip,
            Err(e) => {
                log::error!("{}", e);
                std::process::exit(1);
            }
        },
    };
    let addr = SocketAddr::new(ip, opt.port.unwrap_or_else(|| settings.http_port()));

    if settings.smtp().credentials().is_err() {
        log::warn!("SMTP settings incomplete; form submissions will fail until SMTP_HOST, SMTP_USER and SMTP_PASS are set");
    }

    log::info!("Starting server...");

    let ctx = Arc::new(config::Context::new(settings));

    if let Err(e) = http::run(addr, ctx).await {
        log::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
