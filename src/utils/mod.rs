// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 orderflow contributors

//! Utility modules
//!
//! Common utilities for the orderflow CLI.

pub mod colors;

pub use colors::*;
