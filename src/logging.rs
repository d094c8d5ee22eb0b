// ABOUTME: Logging setup with console output and a size-rotated log file
// ABOUTME: Builds the tracing subscriber from LogSettings and applies noise-reduction filters
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Structured logging with console output and file rotation

use crate::config::{LogFormat, LogSettings};
use crate::constants::service_names;
use crate::errors::{AppError, AppResult};
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use serde_json::json;
use std::env;
use std::fs;
use std::io;
use std::sync::Mutex;
use tracing::info;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

/// Boxed layer over the base registry
type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level, format and rotation parameters
    pub settings: LogSettings,
    /// Include source file and line numbers on the console
    pub include_location: bool,
    /// Service name for structured logging
    pub service_name: String,
    /// Service version
    pub service_version: String,
}

impl LoggingConfig {
    /// Create logging configuration from loaded settings
    #[must_use]
    pub fn new(settings: LogSettings) -> Self {
        Self {
            settings,
            include_location: env::var("LOG_INCLUDE_LOCATION").is_ok(),
            service_name: service_names::MATRIX_ARCHIVER.into(),
            service_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }

    /// Filter applied to both outputs
    ///
    /// `RUST_LOG` replaces the configured level when set, including any
    /// `matrix_archiver` directive it carries; the noise-reduction directives
    /// are always added on top.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        let rust_log = env::var("RUST_LOG").ok();
        let base = rust_log
            .clone()
            .unwrap_or_else(|| self.settings.level.to_string());

        let filter = [
            "hyper=warn",
            "reqwest=warn",
            "rustls=warn",
            "sqlx=warn",
            "matrix_sdk=warn",
            "matrix_sdk_base=warn",
            "matrix_sdk::sync=warn",
            "ruma=warn",
        ]
        .iter()
        .fold(EnvFilter::new(base), |filter, directive| {
            filter.add_directive(parse_directive(directive, tracing::Level::WARN))
        });

        if rust_log.is_some() {
            return filter;
        }
        filter.add_directive(parse_directive(
            &format!("matrix_archiver={}", self.settings.level),
            self.settings.level.to_tracing_level(),
        ))
    }

    /// Open the rotated file writer, creating the parent directory
    ///
    /// # Errors
    ///
    /// Returns a storage error if the log directory cannot be created
    pub fn file_writer(&self) -> AppResult<FileRotate<AppendCount>> {
        let path = &self.settings.file_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::storage(format!(
                    "Cannot create log directory {}: {e}",
                    parent.display()
                ))
                .with_source(e)
            })?;
        }

        Ok(FileRotate::new(
            path,
            AppendCount::new(self.settings.backup_count),
            ContentLimit::Bytes(self.settings.max_size_bytes()),
            Compression::None,
            #[cfg(unix)]
            None,
        ))
    }

    fn console_layer(&self) -> BoxedLayer {
        let layer = fmt::layer()
            .with_file(self.include_location)
            .with_line_number(self.include_location)
            .with_target(true)
            .with_writer(io::stdout)
            .with_span_events(FmtSpan::NONE);

        match self.settings.format {
            LogFormat::Json => layer.json().boxed(),
            LogFormat::Pretty => layer.boxed(),
            LogFormat::Compact => layer
                .compact()
                .with_target(false)
                .with_file(false)
                .with_line_number(false)
                .boxed(),
        }
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be opened or a global
    /// subscriber is already installed
    pub fn init(&self) -> AppResult<()> {
        let file_layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_writer(Mutex::new(self.file_writer()?))
            .boxed();

        tracing_subscriber::registry()
            .with(vec![self.console_layer(), file_layer])
            .with(self.env_filter())
            .try_init()
            .map_err(|e| AppError::internal(format!("Failed to initialize logging: {e}")))?;

        self.log_startup_info();
        Ok(())
    }

    /// Log structured startup information
    fn log_startup_info(&self) {
        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            log.level = %self.settings.level,
            log.format = ?self.settings.format,
            "Matrix archiver starting up"
        );

        let config_summary = json!({
            "service": {
                "name": self.service_name,
                "version": self.service_version,
            },
            "logging": {
                "level": self.settings.level.to_string(),
                "format": format!("{:?}", self.settings.format),
                "file": self.settings.file_path.display().to_string(),
                "max_size_mb": self.settings.max_size_mb,
                "backup_count": self.settings.backup_count,
            }
        });

        info!("Logging configured: {}", config_summary);
    }
}

fn parse_directive(directive: &str, fallback: tracing::Level) -> Directive {
    directive.parse().unwrap_or_else(|_| fallback.into())
}

/// Initialize logging from loaded settings
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init(settings: &LogSettings) -> AppResult<()> {
    LoggingConfig::new(settings.clone()).init()
}
