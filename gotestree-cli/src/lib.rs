// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! An explorer for Go tests.
//!
//! This binary discovers tests from Go source trees, reconciles `go test`
//! transcripts against the discovered hierarchy, and manages the persisted
//! run-flag selection. See `gotestree --help` for usage.

#![warn(missing_docs)]

mod dispatch;
mod output;

#[doc(hidden)]
pub use dispatch::*;
