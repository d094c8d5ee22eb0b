// ABOUTME: Re-exports the archived message models from the core crate
// ABOUTME: MessageRecord is written by the listener, StoredMessage is read back from the store
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Data Models
//!
//! - [`MessageRecord`]: one text message as it is inserted
//! - [`StoredMessage`]: a persisted row with its id and insertion time

pub use matrix_archiver_core::models::*;
