// ABOUTME: Core types and constants for the Matrix message archiver
// ABOUTME: Foundation crate with error handling, the message record model, and constants
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

#![deny(unsafe_code)]

//! # Matrix Archiver Core
//!
//! Foundation crate providing shared types and constants for the Matrix message
//! archiver. This crate is designed to change infrequently, enabling incremental
//! compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError`, `ErrorCode`, and `DatabaseError`
//! - **constants**: Environment variable names and defaults organized by domain
//! - **models**: The persisted `MessageRecord` and its builder

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants and configuration defaults organized by domain
pub mod constants;

/// Core data models (`MessageRecord`)
pub mod models;
