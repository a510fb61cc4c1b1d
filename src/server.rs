//! MCP server initialization for stdio and Streamable HTTP transports.
//!
//! Provides [`serve_stdio`] and [`serve_http`] entry points that open the
//! database, run the startup retention sweep, and hand the connection to the
//! MCP tool handler.

use crate::config::HealthConfig;
use crate::db;
use crate::health::retention;
use crate::tools::HealthTools;
use anyhow::{Context, Result};
use rmcp::ServiceExt;
use std::sync::{Arc, Mutex};

/// Shared setup: open DB, purge expired rows, wrap state for sharing.
fn setup_shared_state(
    config: HealthConfig,
) -> Result<(Arc<Mutex<rusqlite::Connection>>, Arc<HealthConfig>)> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    // Runs regardless of purge_on_each_call.
    let purged = retention::purge_expired_now(&conn, &config.retention)
        .context("startup retention sweep failed")?;
    tracing::info!(
        medical_history = purged.medical_history_deleted,
        food_24h = purged.food_deleted,
        "startup retention sweep complete"
    );

    Ok((Arc::new(Mutex::new(conn)), Arc::new(config)))
}

/// Start the transport named in `server.transport`.
pub async fn serve(config: HealthConfig) -> Result<()> {
    match config.server.transport.as_str() {
        "stdio" => serve_stdio(config).await,
        "http" | "sse" => serve_http(config).await,
        other => anyhow::bail!("unknown transport '{other}' (expected 'stdio' or 'http')"),
    }
}

/// Start the MCP server over stdio transport.
pub async fn serve_stdio(config: HealthConfig) -> Result<()> {
    tracing::info!("starting healthdb MCP server on stdio");

    let (db, config) = setup_shared_state(config)?;

    let tools = HealthTools::new(db, config);
    let transport = rmcp::transport::stdio();

    let server = tools.serve(transport).await?;
    tracing::info!("MCP server running, waiting for client");

    server.waiting().await?;
    tracing::info!("MCP server shut down");

    Ok(())
}

/// Start the MCP server over Streamable HTTP transport at `/mcp`.
pub async fn serve_http(config: HealthConfig) -> Result<()> {
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    tracing::info!(addr = %bind_addr, "starting healthdb MCP server on HTTP");

    let (db, config) = setup_shared_state(config)?;

    let service = rmcp::transport::streamable_http_server::StreamableHttpService::new(
        move || Ok(HealthTools::new(db.clone(), config.clone())),
        rmcp::transport::streamable_http_server::session::local::LocalSessionManager::default()
            .into(),
        Default::default(),
    );

    let router = axum::Router::new().nest_service("/mcp", service);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "MCP server listening at http://{bind_addr}/mcp");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
