// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serializable summaries of the test hierarchy, for JSON output.

use crate::status::TestStatus;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// A serializable summary of a [`TestList`](crate::list::TestList).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestListSummary {
    /// The total number of top-level tests.
    pub test_count: usize,

    /// Modules in display order.
    pub modules: Vec<ModuleSummary>,
}

/// A serializable summary of one module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleSummary {
    /// The module path.
    pub name: String,

    /// The module root directory.
    pub root: Utf8PathBuf,

    /// Packages in display order.
    pub packages: Vec<PackageSummary>,
}

/// A serializable summary of one package.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PackageSummary {
    /// The absolute package directory.
    pub path: Utf8PathBuf,

    /// The display name.
    pub display_name: String,

    /// Files in display order.
    pub files: Vec<FileSummary>,
}

/// A serializable summary of one test file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FileSummary {
    /// The absolute file path.
    pub path: Utf8PathBuf,

    /// Tests in source order.
    pub tests: Vec<TestSummary>,
}

/// A serializable summary of one test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TestSummary {
    /// The test function name.
    pub name: String,

    /// The 1-based declaration line.
    pub line: usize,

    /// The last observed status.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<TestStatus>,

    /// The last completed duration, in fractional seconds.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration_secs: Option<f64>,

    /// Sub-tests; absent, empty and non-empty are all meaningful.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sub_tests: Option<Vec<SubTestSummary>>,
}

/// A serializable summary of one sub-test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubTestSummary {
    /// The display name.
    pub name: String,

    /// The run-matching form, `Parent/raw_name`.
    pub full_name: String,

    /// The 1-based line the name was recovered from, when statically known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub line: Option<usize>,

    /// The last observed status.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub status: Option<TestStatus>,

    /// The last completed duration, in fractional seconds.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration_secs: Option<f64>,
}
