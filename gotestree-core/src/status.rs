// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test statuses and the identity-keyed status map.
//!
//! Statuses are not stored solely on tree nodes: every discovery pass replaces
//! the whole [`TestList`](crate::list::TestList), so the authoritative record
//! is a [`StatusMap`] keyed by stable identity (package path plus test name).
//! [`ModelStore`](crate::store::ModelStore) re-attaches the map to each fresh
//! tree.

use crate::{errors::TestStatusParseError, list::TestList};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fmt, str::FromStr, time::Duration};

/// The observed state of a test or sub-test.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestStatus {
    /// The test is currently executing.
    ///
    /// This state is transient: a running update never clears the duration
    /// recorded by the last completed run.
    Running,

    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test was skipped.
    Skipped,

    /// The test was observed in run output but no outcome was recorded, e.g.
    /// a start marker with no matching result line.
    Unknown,
}

impl TestStatus {
    /// String representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["running", "passed", "failed", "skipped", "unknown"]
    }

    /// Returns true if the test was successful.
    pub fn is_success(self) -> bool {
        matches!(self, TestStatus::Passed)
    }

    /// Returns true if this status represents a completed run.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TestStatus::Running)
    }

    /// Sort rank for display within one history entry: failing first,
    /// inconclusive second, passing last.
    pub(crate) fn display_rank(self) -> u8 {
        match self {
            TestStatus::Failed => 0,
            TestStatus::Running | TestStatus::Skipped | TestStatus::Unknown => 1,
            TestStatus::Passed => 2,
        }
    }
}

impl FromStr for TestStatus {
    type Err = TestStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "running" => TestStatus::Running,
            "passed" => TestStatus::Passed,
            "failed" => TestStatus::Failed,
            "skipped" => TestStatus::Skipped,
            "unknown" => TestStatus::Unknown,
            other => return Err(TestStatusParseError::new(other)),
        };
        Ok(val)
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TestStatus::Running => "running",
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::Skipped => "skipped",
            TestStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Stable identity for a top-level test: package path plus test name.
///
/// Duplicate test names within one package are not distinguished; the first
/// match in traversal order wins. This is a documented limitation.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct TestKey {
    /// The absolute package directory.
    pub package_path: Utf8PathBuf,
    /// The test function name.
    pub name: String,
}

impl TestKey {
    /// Creates a new test key.
    pub fn new(package_path: impl Into<Utf8PathBuf>, name: impl Into<String>) -> Self {
        Self {
            package_path: package_path.into(),
            name: name.into(),
        }
    }
}

/// Stable identity for a sub-test.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SubTestKey {
    /// The absolute package directory.
    pub package_path: Utf8PathBuf,
    /// The parent test function name.
    pub parent_name: String,
    /// The run-matching form, `Parent/raw_name`.
    pub full_name: String,
}

impl SubTestKey {
    /// Creates a new sub-test key.
    pub fn new(
        package_path: impl Into<Utf8PathBuf>,
        parent_name: impl Into<String>,
        full_name: impl Into<String>,
    ) -> Self {
        Self {
            package_path: package_path.into(),
            parent_name: parent_name.into(),
            full_name: full_name.into(),
        }
    }
}

/// A recorded status along with the last completed duration.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusEntry {
    /// The most recent status.
    pub status: TestStatus,
    /// The duration of the last completed run, if any.
    pub duration: Option<Duration>,
}

/// Status storage that survives tree rebuilds.
///
/// Updates are recorded here and mirrored onto the current tree; after a
/// rebuild the map is re-attached wholesale via [`StatusMap::reapply_to`].
#[derive(Clone, Debug, Default)]
pub struct StatusMap {
    tests: HashMap<TestKey, StatusEntry>,
    sub_tests: HashMap<SubTestKey, StatusEntry>,
}

impl StatusMap {
    /// Creates an empty status map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a top-level test status, returning the updated entry.
    ///
    /// The duration is applied only for non-running statuses, so a transient
    /// running update never clobbers the last completed duration.
    pub fn record_test(
        &mut self,
        key: TestKey,
        status: TestStatus,
        duration: Option<Duration>,
    ) -> StatusEntry {
        let entry = self.tests.entry(key).or_insert(StatusEntry {
            status,
            duration: None,
        });
        Self::record(entry, status, duration)
    }

    /// Records a sub-test status, returning the updated entry.
    pub fn record_sub_test(
        &mut self,
        key: SubTestKey,
        status: TestStatus,
        duration: Option<Duration>,
    ) -> StatusEntry {
        let entry = self.sub_tests.entry(key).or_insert(StatusEntry {
            status,
            duration: None,
        });
        Self::record(entry, status, duration)
    }

    fn record(
        entry: &mut StatusEntry,
        status: TestStatus,
        duration: Option<Duration>,
    ) -> StatusEntry {
        entry.status = status;
        if status.is_terminal()
            && let Some(duration) = duration
        {
            entry.duration = Some(duration);
        }
        *entry
    }

    /// Returns the recorded entry for a top-level test.
    pub fn test_entry(&self, package_path: &Utf8Path, name: &str) -> Option<StatusEntry> {
        // TestKey borrows would need a two-field lookup key; cloning here is
        // fine since lookups are rare compared to traversal.
        self.tests
            .get(&TestKey::new(package_path.to_owned(), name))
            .copied()
    }

    /// Returns the recorded entry for a sub-test.
    pub fn sub_test_entry(
        &self,
        package_path: &Utf8Path,
        parent_name: &str,
        full_name: &str,
    ) -> Option<StatusEntry> {
        self.sub_tests
            .get(&SubTestKey::new(
                package_path.to_owned(),
                parent_name,
                full_name,
            ))
            .copied()
    }

    /// Attaches every recorded status to the matching entities of a freshly
    /// built tree. Entries with no matching entity are kept for later
    /// rebuilds.
    pub fn reapply_to(&self, list: &mut TestList) {
        for (key, entry) in &self.tests {
            if let Some(test) = list.find_test_mut(&key.package_path, &key.name) {
                test.status = Some(entry.status);
                test.duration = entry.duration;
            }
        }
        for (key, entry) in &self.sub_tests {
            if let Some(sub_test) =
                list.find_sub_test_mut(&key.package_path, &key.parent_name, &key.full_name)
            {
                sub_test.status = Some(entry.status);
                sub_test.duration = entry.duration;
            }
        }
    }

    /// Returns the number of recorded top-level entries.
    pub fn test_count(&self) -> usize {
        self.tests.len()
    }

    /// Removes all recorded statuses.
    pub fn clear(&mut self) {
        self.tests.clear();
        self.sub_tests.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("running", TestStatus::Running; "running")]
    #[test_case("passed", TestStatus::Passed; "passed")]
    #[test_case("failed", TestStatus::Failed; "failed")]
    #[test_case("skipped", TestStatus::Skipped; "skipped")]
    #[test_case("unknown", TestStatus::Unknown; "unknown")]
    fn status_from_str(input: &str, expected: TestStatus) {
        assert_eq!(input.parse::<TestStatus>().unwrap(), expected);
        assert_eq!(expected.to_string(), input);
    }

    #[test]
    fn status_from_str_error() {
        let error = "pass".parse::<TestStatus>().unwrap_err();
        assert!(error.to_string().contains("known values"));
    }

    #[test]
    fn running_preserves_duration() {
        let mut map = StatusMap::new();
        let key = TestKey::new("/pkg", "TestFoo");

        map.record_test(key.clone(), TestStatus::Running, None);
        let entry = map.test_entry(Utf8Path::new("/pkg"), "TestFoo").unwrap();
        assert_eq!(entry.status, TestStatus::Running);
        assert_eq!(entry.duration, None);

        map.record_test(
            key.clone(),
            TestStatus::Passed,
            Some(Duration::from_millis(20)),
        );
        // A second running transition, with or without a duration, keeps the
        // completed duration.
        map.record_test(key.clone(), TestStatus::Running, None);
        map.record_test(key.clone(), TestStatus::Running, Some(Duration::ZERO));

        let entry = map.test_entry(Utf8Path::new("/pkg"), "TestFoo").unwrap();
        assert_eq!(entry.status, TestStatus::Running);
        assert_eq!(entry.duration, Some(Duration::from_millis(20)));
    }

    #[test]
    fn terminal_without_duration_keeps_previous() {
        let mut map = StatusMap::new();
        let key = TestKey::new("/pkg", "TestFoo");
        map.record_test(
            key.clone(),
            TestStatus::Passed,
            Some(Duration::from_millis(50)),
        );
        map.record_test(key.clone(), TestStatus::Failed, None);

        let entry = map.test_entry(Utf8Path::new("/pkg"), "TestFoo").unwrap();
        assert_eq!(entry.status, TestStatus::Failed);
        assert_eq!(entry.duration, Some(Duration::from_millis(50)));
    }
}
