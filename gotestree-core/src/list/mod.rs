// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The test hierarchy: Module → Package → File → Test (→ SubTest).

mod output_format;
mod summary;
mod test_list;

pub use output_format::OutputFormat;
pub use summary::{
    FileSummary, ModuleSummary, PackageSummary, SubTestSummary, TestListSummary, TestSummary,
};
pub use test_list::{
    GoModule, GoPackage, ScannedFile, Styles, SubTest, TestCase, TestFile, TestList,
};
