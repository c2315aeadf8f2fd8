// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The in-memory model store.
//!
//! [`ModelStore`] owns the current [`TestList`] plus all mutable run state:
//! the identity-keyed status map and the run-history ledger. Every mutation
//! goes through it, so callers that are ever parallelized serialize through
//! one gate. Reads hand out plain borrows; discovery results are installed
//! wholesale.

use crate::{
    history::{RunHistory, RunHistoryEntry, RunResult},
    list::{SubTest, TestList},
    status::{StatusMap, SubTestKey, TestKey, TestStatus},
    transcript::{RunOutcome, RunOutput},
};
use camino::Utf8Path;
use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::debug;

/// Owns the authoritative tree and all run state that outlives rebuilds.
#[derive(Clone, Debug, Default)]
pub struct ModelStore {
    list: TestList,
    statuses: StatusMap,
    history: RunHistory,
}

impl ModelStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a freshly discovered list, replacing the previous tree
    /// entirely and re-attaching recorded statuses by (package path, test
    /// name) identity.
    ///
    /// There is no cancellation for in-flight discoveries: when calls
    /// overlap, whichever finishes last wins, even if it started first.
    pub fn install_list(&mut self, mut list: TestList) {
        self.statuses.reapply_to(&mut list);
        self.list = list;
    }

    /// The current test list.
    pub fn test_list(&self) -> &TestList {
        &self.list
    }

    /// The recorded run history.
    pub fn history(&self) -> &RunHistory {
        &self.history
    }

    /// Sets the status of the first test matching `name` within the package
    /// at `package_path`.
    ///
    /// The duration is applied only for non-running statuses. A missing
    /// entity is a silent no-op: run output routinely references tests the
    /// static model has not (or no longer) discovered.
    pub fn set_test_status(
        &mut self,
        package_path: &Utf8Path,
        name: &str,
        status: TestStatus,
        duration: Option<Duration>,
    ) {
        let Some(test) = self.list.find_test_mut(package_path, name) else {
            debug!("no test {name} in {package_path}, ignoring status update");
            return;
        };
        let entry = self.statuses.record_test(
            TestKey::new(package_path.to_owned(), name),
            status,
            duration,
        );
        test.status = Some(entry.status);
        test.duration = entry.duration;
    }

    /// Sets the status of a sub-test, located by parent name and run-matching
    /// full name within the package at `package_path`.
    pub fn set_sub_test_status(
        &mut self,
        package_path: &Utf8Path,
        parent_name: &str,
        full_name: &str,
        status: TestStatus,
        duration: Option<Duration>,
    ) {
        let Some(sub_test) = self
            .list
            .find_sub_test_mut(package_path, parent_name, full_name)
        else {
            debug!("no sub-test {full_name} in {package_path}, ignoring status update");
            return;
        };
        let entry = self.statuses.record_sub_test(
            SubTestKey::new(package_path.to_owned(), parent_name, full_name),
            status,
            duration,
        );
        sub_test.status = Some(entry.status);
        sub_test.duration = entry.duration;
    }

    /// Reconciles parsed run output into the tree.
    ///
    /// For every test whose name matches a discovered parent (within
    /// `package_path` if given, otherwise anywhere), the sub-test list is
    /// replaced in full by entries derived from the output. Raw sub-test
    /// names have underscores converted back to spaces for display; this is
    /// lossy when a name legitimately contained an underscore, and is
    /// preserved as-is rather than guessed around. Top-level results are
    /// applied through the regular status rules; a start marker with no
    /// result marks the test as running.
    pub fn apply_run_output(&mut self, output: &RunOutput, package_path: Option<&Utf8Path>) {
        let mut recorded: Vec<(SubTestKey, TestStatus, Option<Duration>)> = Vec::new();

        for (parent, subs) in output.sub_tests() {
            for test in self
                .list
                .tests_scoped_mut(package_path)
                .filter(|test| &test.name == parent)
            {
                let replacement: Vec<SubTest> = subs
                    .iter()
                    .map(|(raw, record)| {
                        let status = sub_status(record.outcome);
                        let full_name = format!("{parent}/{raw}");
                        recorded.push((
                            SubTestKey::new(test.package_path.clone(), parent, full_name.clone()),
                            status,
                            record.duration,
                        ));
                        SubTest {
                            name: raw.replace('_', " "),
                            full_name,
                            parent_name: parent.clone(),
                            line: None,
                            file: test.file.clone(),
                            package_path: test.package_path.clone(),
                            status: Some(status),
                            duration: record.duration,
                        }
                    })
                    .collect();
                test.sub_tests = Some(replacement);
            }
        }

        for (key, status, duration) in recorded {
            self.statuses.record_sub_test(key, status, duration);
        }

        for (name, record) in output.top_level() {
            let status = record.outcome.map_or(TestStatus::Running, outcome_status);
            let packages: Vec<_> = match package_path {
                Some(path) => vec![path.to_owned()],
                None => {
                    let mut paths: Vec<_> = self
                        .list
                        .iter_tests()
                        .filter(|test| &test.name == name)
                        .map(|test| test.package_path.clone())
                        .collect();
                    paths.dedup();
                    paths
                }
            };
            for path in packages {
                self.set_test_status(&path, name, status, record.duration);
            }
        }
    }

    /// Records one completed run in the history ledger.
    ///
    /// A run with no results is not recorded.
    pub fn record_run(
        &mut self,
        label: &str,
        results: Vec<RunResult>,
        now: DateTime<Utc>,
    ) -> Option<&RunHistoryEntry> {
        self.history.record(label, results, now)
    }

    /// Collects one [`RunResult`] per test or sub-test that currently has a
    /// status, suitable for recording a run.
    pub fn collect_results(&self) -> Vec<RunResult> {
        let mut results = Vec::new();
        for test in self.list.iter_tests() {
            if let Some(status) = test.status {
                results.push(RunResult {
                    test_name: test.name.clone(),
                    package_path: test.package_path.clone(),
                    file: test.file.clone(),
                    status,
                    duration: test.duration,
                });
            }
            if let Some(subs) = &test.sub_tests {
                for sub in subs {
                    if let Some(status) = sub.status {
                        results.push(RunResult {
                            test_name: sub.full_name.clone(),
                            package_path: sub.package_path.clone(),
                            file: sub.file.clone(),
                            status,
                            duration: sub.duration,
                        });
                    }
                }
            }
        }
        results
    }

    /// Removes all recorded runs.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

fn sub_status(outcome: Option<RunOutcome>) -> TestStatus {
    // A start marker with no result stays inconclusive rather than running:
    // by the time a transcript exists, the run is over.
    outcome.map_or(TestStatus::Unknown, outcome_status)
}

fn outcome_status(outcome: RunOutcome) -> TestStatus {
    match outcome {
        RunOutcome::Passed => TestStatus::Passed,
        RunOutcome::Failed => TestStatus::Failed,
        RunOutcome::Skipped => TestStatus::Skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        go_mod::DiscoveredModule,
        list::ScannedFile,
        scan::{ScanResult, ScannedSubTest, ScannedTest},
    };
    use camino::Utf8Path;
    use pretty_assertions::assert_eq;

    fn scanned_test(name: &str, line: usize, sub_tests: Option<Vec<ScannedSubTest>>) -> ScannedTest {
        ScannedTest {
            name: name.to_owned(),
            line,
            sub_tests,
        }
    }

    fn store_with(files: Vec<(&str, Vec<ScannedTest>)>) -> ModelStore {
        let modules = vec![DiscoveredModule {
            name: "example.com/widget".to_owned(),
            root: "/w".into(),
        }];
        let files = files
            .into_iter()
            .map(|(path, tests)| ScannedFile {
                path: path.into(),
                result: ScanResult {
                    package_clause: None,
                    tests,
                },
            })
            .collect();
        let mut store = ModelStore::new();
        store.install_list(TestList::build(modules, files));
        store
    }

    #[test]
    fn status_updates_are_package_scoped() {
        let mut store = store_with(vec![
            ("/w/one/a_test.go", vec![scanned_test("TestSame", 1, None)]),
            ("/w/two/a_test.go", vec![scanned_test("TestSame", 1, None)]),
        ]);

        store.set_test_status(Utf8Path::new("/w/one"), "TestSame", TestStatus::Failed, None);

        let statuses: Vec<_> = store
            .test_list()
            .iter_tests()
            .map(|test| (test.package_path.as_str(), test.status))
            .collect();
        assert_eq!(
            statuses,
            vec![
                ("/w/one", Some(TestStatus::Failed)),
                ("/w/two", None),
            ],
        );
    }

    #[test]
    fn unknown_entity_is_a_silent_noop() {
        let mut store = store_with(vec![(
            "/w/one/a_test.go",
            vec![scanned_test("TestA", 1, None)],
        )]);
        store.set_test_status(Utf8Path::new("/w/one"), "TestMissing", TestStatus::Passed, None);
        store.set_sub_test_status(
            Utf8Path::new("/w/one"),
            "TestA",
            "TestA/missing",
            TestStatus::Passed,
            None,
        );
        assert_eq!(store.test_list().iter_tests().next().unwrap().status, None);
    }

    #[test]
    fn running_does_not_clear_last_duration() {
        let mut store = store_with(vec![(
            "/w/one/a_test.go",
            vec![scanned_test("TestA", 1, None)],
        )]);
        let pkg = Utf8Path::new("/w/one");

        store.set_test_status(pkg, "TestA", TestStatus::Running, None);
        store.set_test_status(
            pkg,
            "TestA",
            TestStatus::Passed,
            Some(Duration::from_millis(20)),
        );
        store.set_test_status(pkg, "TestA", TestStatus::Running, None);

        let test = store.test_list().iter_tests().next().unwrap();
        assert_eq!(test.status, Some(TestStatus::Running));
        assert_eq!(test.duration, Some(Duration::from_millis(20)));
    }

    #[test]
    fn duplicate_names_resolve_to_first_match() {
        let mut store = store_with(vec![
            ("/w/one/a_test.go", vec![scanned_test("TestDup", 1, None)]),
            ("/w/one/b_test.go", vec![scanned_test("TestDup", 1, None)]),
        ]);

        store.set_test_status(Utf8Path::new("/w/one"), "TestDup", TestStatus::Passed, None);

        let statuses: Vec<_> = store
            .test_list()
            .iter_tests()
            .map(|test| test.status)
            .collect();
        assert_eq!(statuses, vec![Some(TestStatus::Passed), None]);
    }

    #[test]
    fn run_output_replaces_sub_tests_in_full() {
        let mut store = store_with(vec![(
            "/w/one/a_test.go",
            vec![scanned_test(
                "TestFoo",
                1,
                Some(vec![ScannedSubTest::new("stale case", 2)]),
            )],
        )]);

        let output = RunOutput::parse(
            "=== RUN   TestFoo/bar_baz\n    --- PASS: TestFoo/bar_baz (0.01s)\n",
        );
        store.apply_run_output(&output, Some(Utf8Path::new("/w/one")));

        let test = store.test_list().iter_tests().next().unwrap();
        let subs = test.sub_tests.as_ref().unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].name, "bar baz");
        assert_eq!(subs[0].full_name, "TestFoo/bar_baz");
        assert_eq!(subs[0].status, Some(TestStatus::Passed));
        assert_eq!(subs[0].duration, Some(Duration::from_millis(10)));
    }

    #[test]
    fn run_output_scoping_protects_other_packages() {
        let mut store = store_with(vec![
            (
                "/w/one/a_test.go",
                vec![scanned_test("TestFoo", 1, Some(vec![]))],
            ),
            (
                "/w/two/a_test.go",
                vec![scanned_test("TestFoo", 1, Some(vec![]))],
            ),
        ]);

        let output = RunOutput::parse("    --- FAIL: TestFoo/case (0.10s)\n");
        store.apply_run_output(&output, Some(Utf8Path::new("/w/one")));

        let subs: Vec<usize> = store
            .test_list()
            .iter_tests()
            .map(|test| test.sub_tests.as_ref().unwrap().len())
            .collect();
        assert_eq!(subs, vec![1, 0]);
    }

    #[test]
    fn statuses_survive_rebuild() {
        let mut store = store_with(vec![(
            "/w/one/a_test.go",
            vec![scanned_test("TestA", 1, None)],
        )]);
        let pkg = Utf8Path::new("/w/one");
        store.set_test_status(pkg, "TestA", TestStatus::Failed, Some(Duration::from_secs(1)));

        // A second discovery pass rebuilds the tree from scratch; the status
        // map re-attaches by identity. Whichever list is installed last wins,
        // regardless of which discovery started first.
        let rebuilt = TestList::build(
            vec![DiscoveredModule {
                name: "example.com/widget".to_owned(),
                root: "/w".into(),
            }],
            vec![ScannedFile {
                path: "/w/one/a_test.go".into(),
                result: ScanResult {
                    package_clause: None,
                    tests: vec![
                        scanned_test("TestA", 1, None),
                        scanned_test("TestNew", 8, None),
                    ],
                },
            }],
        );
        store.install_list(rebuilt);

        let statuses: Vec<_> = store
            .test_list()
            .iter_tests()
            .map(|test| (test.name.as_str(), test.status, test.duration))
            .collect();
        assert_eq!(
            statuses,
            vec![
                (
                    "TestA",
                    Some(TestStatus::Failed),
                    Some(Duration::from_secs(1)),
                ),
                ("TestNew", None, None),
            ],
        );
    }

    #[test]
    fn record_run_from_collected_results() {
        let mut store = store_with(vec![(
            "/w/one/a_test.go",
            vec![
                scanned_test("TestA", 1, None),
                scanned_test("TestB", 8, None),
            ],
        )]);
        let pkg = Utf8Path::new("/w/one");
        store.set_test_status(pkg, "TestA", TestStatus::Passed, Some(Duration::from_millis(5)));
        store.set_test_status(pkg, "TestB", TestStatus::Failed, None);

        let results = store.collect_results();
        assert_eq!(results.len(), 2);

        let entry = store
            .record_run("widget", results, chrono::Utc::now())
            .unwrap();
        let names: Vec<&str> = entry
            .results()
            .iter()
            .map(|r| r.test_name.as_str())
            .collect();
        assert_eq!(names, ["TestB", "TestA"]);
    }
}

