// ABOUTME: Matrix archiver binary: loads settings, opens the store and runs the listener
// ABOUTME: Exits non-zero on startup failures and zero after an interrupt-driven shutdown
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Matrix Archiver Binary
//!
//! Persists Matrix room messages into `SQLite` or `PostgreSQL` until
//! interrupted with Ctrl-C or SIGTERM.

use anyhow::{Context, Result};
use clap::Parser;
use matrix_archiver::config::Settings;
use matrix_archiver::database_plugins::factory::Database;
use matrix_archiver::database_plugins::DatabaseProvider;
use matrix_archiver::listener::{Listener, MatrixSession};
use matrix_archiver::logging;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "matrix-archiver")]
#[command(about = "Archive Matrix room messages into SQLite or PostgreSQL")]
#[command(version)]
struct Args {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, value_name = "PATH")]
    env_file: Option<PathBuf>,

    /// Validate configuration and the database connection, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let settings = match load_settings(&args) {
        Ok(settings) => Arc::new(settings),
        Err(e) => {
            // Logging is configured from these settings, so report on stderr
            eprintln!("matrix-archiver: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init(&settings.logging) {
        eprintln!("matrix-archiver: {e}");
        return ExitCode::FAILURE;
    }

    match run(settings, args.check).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn load_settings(args: &Args) -> Result<Settings> {
    let settings = match &args.env_file {
        Some(path) => Settings::from_env_file(path),
        None => Settings::from_env(),
    };
    settings.context("Failed to load configuration")
}

async fn run(settings: Arc<Settings>, check_only: bool) -> Result<()> {
    info!("Starting Matrix archiver");
    info!("{}", settings.summary());

    let database = Database::from_settings(&settings.database)
        .await
        .context("Failed to open message store")?;
    info!(
        "Database initialized successfully: {}",
        database.backend_info()
    );

    if check_only {
        let count = database.message_count().await?;
        info!(messages = count, "Configuration check passed");
        return Ok(());
    }

    let session = MatrixSession::connect(&settings.matrix.homeserver).await?;
    let mut listener = Listener::new(session, database, settings);
    let rooms = listener
        .connect_and_join()
        .await
        .context("Failed to establish Matrix session")?;
    info!(rooms = rooms.len(), "Listening for new messages");

    let summary = listener.run(shutdown_signal()).await?;
    info!(
        stored = summary.stored,
        failed = summary.failed,
        "Matrix archiver stopped"
    );
    Ok(())
}

/// Resolves when SIGINT (Ctrl-C) or SIGTERM is received
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }

    info!("Shutdown signal received, closing Matrix session");
}
