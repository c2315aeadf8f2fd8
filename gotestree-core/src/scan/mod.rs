// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static scanning of Go test sources.
//!
//! The scanner recovers structural boundaries (test function bodies) and
//! statically-knowable sub-tests from raw source text. It is a best-effort
//! heuristic, not a Go parser: brace depth is tracked line by line and
//! sub-tests are recognized from literal `.Run("name", ...)` calls or
//! `name: "..."` fields of table-driven cases.
//!
//! The [`FileScanner`] trait is the seam between this heuristic and the rest
//! of the engine; the tree builder and status tracker only consume
//! [`ScanResult`] values, so the implementation can be swapped for a real
//! parser later.

mod heuristic;

pub use heuristic::HeuristicScanner;

/// Scans one source file's text for test functions.
pub trait FileScanner {
    /// Scans `contents` and returns everything statically recoverable.
    ///
    /// Scanning is infallible: unparseable constructs simply contribute
    /// nothing to the result.
    fn scan(&self, contents: &str) -> ScanResult;
}

/// The result of scanning one file.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScanResult {
    /// The file's declared package clause (`package foo`), if present.
    pub package_clause: Option<String>,

    /// Top-level test functions in source order.
    pub tests: Vec<ScannedTest>,
}

/// A top-level test, benchmark, example or fuzz function.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScannedTest {
    /// The function name.
    pub name: String,

    /// The 1-based line of the function declaration.
    pub line: usize,

    /// Statically recovered sub-tests.
    ///
    /// Three states are meaningful and must be preserved:
    /// - `None`: no run-helper call at all; the test is never expandable.
    /// - `Some(vec![])`: a table-driven pattern was detected but no names
    ///   could be recovered; concrete names arrive from run output.
    /// - `Some(non-empty)`: names recovered from literal calls or table
    ///   fields, in source order.
    pub sub_tests: Option<Vec<ScannedSubTest>>,
}

/// A statically recovered sub-test.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScannedSubTest {
    /// The display name, as spelled in the source.
    pub name: String,

    /// The run-matching form: the display name with spaces replaced by
    /// underscores, as `go test` reports it.
    pub run_name: String,

    /// The 1-based line of the recovered name, when known.
    pub line: Option<usize>,
}

impl ScannedSubTest {
    pub(crate) fn new(name: &str, line: usize) -> Self {
        Self {
            name: name.to_owned(),
            run_name: name.replace(' ', "_"),
            line: Some(line),
        }
    }
}
