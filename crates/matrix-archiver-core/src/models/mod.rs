// ABOUTME: Core data models for the Matrix message archiver
// ABOUTME: Re-exports the persisted MessageRecord and its stored-row counterpart
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! # Data Models
//!
//! The archiver has a single domain entity: one row per received text message.
//! Records are immutable once built and are never updated or deleted by this
//! system.

mod message;

pub use message::{MessageRecord, StoredMessage};
