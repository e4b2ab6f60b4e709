//! Demo server for the chainline router.
//!
//! ```text
//! GET  /profile          decode an optional body, answer with the time
//! GET  /group/route1     behind two scoped middleware
//! GET  /group/route2
//! GET  /items/{id}       path parameters
//! POST /items            body decoding with validation errors
//! ```

use std::path::PathBuf;
use std::time::Instant;

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use chainline::config::{load_config, ServerConfig};
use chainline::observability::{logging, metrics};
use chainline::{Context, Envelope, Error, HttpServer, Router, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "chainline", version, about = "Demo server for the chainline router")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProfileRequest {
    #[allow(dead_code)]
    name: String,
    #[allow(dead_code)]
    age: u32,
}

#[derive(Debug, Serialize)]
struct ProfileResponse {
    #[serde(rename = "Date")]
    date: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Serialize)]
struct Item {
    name: String,
}

async fn profile(ctx: Context) -> chainline::Result<()> {
    if let Err(e) = ctx.decode::<ProfileRequest>().await {
        ctx.status(StatusCode::BAD_REQUEST)?;
        return ctx.json(&Envelope::failure(e.to_string()));
    }

    ctx.json(&Envelope::success("response time", ProfileResponse { date: Utc::now() }))
}

async fn get_item(ctx: Context) -> chainline::Result<()> {
    let id = ctx.param("id").unwrap_or_default().to_string();
    ctx.json(&Envelope::success("item", serde_json::json!({ "id": id })))
}

async fn create_item(ctx: Context) -> chainline::Result<()> {
    let item: Item = ctx.decode().await?;
    if item.name.trim().is_empty() {
        ctx.status(StatusCode::UNPROCESSABLE_ENTITY)?;
        return Err(Error::msg("name must not be blank"));
    }
    ctx.status(StatusCode::CREATED)?
        .json(&Envelope::success("created", item))
}

async fn empty(_ctx: Context) -> chainline::Result<()> {
    Ok(())
}

/// Logs after the rest of the chain has finished.
async fn request_log(ctx: Context) -> chainline::Result<()> {
    let start = Instant::now();
    let result = ctx.proceed().await;
    tracing::info!(
        method = %ctx.method(),
        path = %ctx.path(),
        failed = result.is_err(),
        elapsed_us = start.elapsed().as_micros() as u64,
        "Chain finished"
    );
    result
}

async fn example(ctx: Context) -> chainline::Result<()> {
    if ctx.header("x-fail").is_some() {
        ctx.status(StatusCode::BAD_REQUEST)?;
        return Err(Error::msg("example middleware rejected the request"));
    }
    ctx.proceed().await
}

fn build_router() -> Router {
    let mut router = Router::new();
    router.use_middleware(request_log);

    router.get("/profile", profile);
    router.get("/items/{id}", get_item);
    router.post("/items", create_item);

    router.with(example).with(example).route("/group", |r| {
        r.get("/route1", empty);
        r.get("/route2", empty);
    });

    router.group(|r| {
        r.use_middleware(example);
        r.get("/route1", empty);
        r.get("/route2", empty);
    });

    router
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability);
    tracing::info!("chainline v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        body_limit_bytes = config.limits.body_limit_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move { shutdown.trigger_on_ctrl_c().await }
    });

    HttpServer::new(config, build_router())
        .run(listener, server_shutdown)
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
