// ABOUTME: Main library entry point for the Matrix message archiver
// ABOUTME: Wires configuration, the chat-session listener and the persistence adapter
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # Matrix Archiver
//!
//! Logs in to a Matrix homeserver, listens for new messages in a set of rooms
//! and stores each text message as a row in `SQLite` or `PostgreSQL`.
//!
//! ## Architecture
//!
//! - **Config**: environment-driven [`config::Settings`], loaded once
//! - **Listener**: [`listener::Listener`] over a [`listener::ChatSession`]
//! - **Database plugins**: [`database_plugins::DatabaseProvider`] with one
//!   implementation per backend, selected by [`database_plugins::factory::Database`]
//! - **Sync state**: resume token persisted between runs
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use matrix_archiver::config::Settings;
//! use matrix_archiver::database_plugins::factory::Database;
//! use matrix_archiver::errors::AppResult;
//! use matrix_archiver::listener::{Listener, MatrixSession};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let settings = Arc::new(Settings::from_env()?);
//!     let database = Database::from_settings(&settings.database).await?;
//!     let session = MatrixSession::connect(&settings.matrix.homeserver).await?;
//!
//!     let mut listener = Listener::new(session, database, settings);
//!     listener.connect_and_join().await?;
//!     listener.run(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!     Ok(())
//! }
//! ```

/// Environment-driven configuration
pub mod config;

/// Environment variable names and defaults
pub mod constants;

/// Persistence adapter with `SQLite` and `PostgreSQL` backends
pub mod database_plugins;

/// Unified error handling
pub mod errors;

/// Chat-session listener
pub mod listener;

/// Console and rotated-file logging
pub mod logging;

/// Message records
pub mod models;

/// Durable sync position
pub mod sync_state;
