// ABOUTME: Unified error handling re-exported from matrix-archiver-core
// ABOUTME: Provides AppError, ErrorCode, AppResult and DatabaseError to the binary crate
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Unified Error Handling System
//!
//! All error types live in `matrix-archiver-core` so that they can be shared by
//! every crate in the workspace. This module re-exports them under the familiar
//! `crate::errors` path.

pub use matrix_archiver_core::errors::*;
