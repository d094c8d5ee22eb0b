// ABOUTME: Re-exports the archiver's shared constants from the core crate
// ABOUTME: Keeps `crate::constants::*` paths stable for the binary and library modules
//
// Licensed under either of Apache License, Version 2.0 or MIT License at your option.
// Copyright ©2025 Async-IO.org

//! Environment variable names, defaults and schema identifiers

pub use matrix_archiver_core::constants::*;
