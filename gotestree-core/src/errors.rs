// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by gotestree.

use crate::{list::OutputFormat, status::TestStatus};
use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while walking a directory tree for test files.
///
/// Failures on individual files are not errors: those files are logged and
/// skipped. This type covers failures that prevent discovery from starting at
/// all.
#[derive(Debug, Error)]
pub enum DiscoverError {
    /// The scan root does not exist or is not a directory.
    #[error("scan root `{root}` is not a directory")]
    RootNotADirectory {
        /// The scan root that was provided.
        root: Utf8PathBuf,
    },

    /// Reading the scan root failed.
    #[error("failed to read scan root `{root}`")]
    RootRead {
        /// The scan root that was provided.
        root: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while reading or writing the persisted run-flag
/// store.
#[derive(Debug, Error)]
pub enum FlagStoreError {
    /// The store file exists but could not be read.
    #[error("failed to read flag store at `{path}`")]
    Read {
        /// The path to the store file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The store file could not be deserialized.
    #[error("failed to parse flag store at `{path}`")]
    Deserialize {
        /// The path to the store file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The store file could not be written.
    #[error("failed to write flag store to `{path}`")]
    Write {
        /// The path to the store file.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: atomicwrites::Error<io::Error>,
    },

    /// A flag identifier was not recognized.
    #[error("unknown flag `{id}` (known flags: {})", .known.join(", "))]
    UnknownFlag {
        /// The identifier that was provided.
        id: String,
        /// All known flag identifiers.
        known: Vec<&'static str>,
    },
}

/// Error returned while parsing a [`TestStatus`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for test status: {input}\n(known values: {})",
    TestStatus::variants().join(", "),
)]
pub struct TestStatusParseError {
    input: String,
}

impl TestStatusParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing an [`OutputFormat`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized output format: {input}\n(known values: {})",
    OutputFormat::variants().join(", "),
)]
pub struct OutputFormatParseError {
    input: String,
}

impl OutputFormatParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}
