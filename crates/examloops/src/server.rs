use anyhow::{Context, Result};
use colored::Colorize;
use tracing::info;

use examloops_core::ExamVerifier;

use crate::api;

pub async fn handle_serve_command(verifier: ExamVerifier, host: &str, port: u16) -> Result<()> {
    let router = api::create_router(verifier);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind API server to {}", addr))?;

    eprintln!();
    eprintln!(
        "  {} {}",
        "->".bright_green(),
        format!("Listening on http://{}", addr).bold()
    );
    eprintln!("  {} Press {} to stop", "->".dimmed(), "Ctrl+C".bold());
    eprintln!();
    info!(%addr, "API server started");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("API server error")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
    eprintln!("\nShutting down...");
}
