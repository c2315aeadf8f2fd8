// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    go_mod::DiscoveredModule,
    helpers::{display_duration, duration_secs, plural},
    list::{
        FileSummary, ModuleSummary, PackageSummary, SubTestSummary, TestListSummary, TestSummary,
    },
    scan::ScanResult,
    status::TestStatus,
};
use camino::{Utf8Path, Utf8PathBuf};
use owo_colors::{OwoColorize, Style};
use std::{collections::BTreeMap, fmt, time::Duration};
use tracing::warn;

/// A scanned test file, ready to be placed into the hierarchy.
///
/// Accepted as input to [`TestList::build`].
#[derive(Clone, Debug)]
pub struct ScannedFile {
    /// The absolute path to the file.
    pub path: Utf8PathBuf,

    /// What the scanner recovered from the file's text.
    pub result: ScanResult,
}

/// The authoritative tree of discovered tests.
///
/// A `TestList` is built in bulk by one discovery pass and replaced wholesale
/// by the next; nothing is merged incrementally. Statuses attached to its
/// nodes are a display projection of the identity-keyed
/// [`StatusMap`](crate::status::StatusMap).
#[derive(Clone, Debug, Default)]
pub struct TestList {
    modules: Vec<GoModule>,
    test_count: usize,
}

/// A Go module: the unit identified by a `go.mod` manifest.
#[derive(Clone, Debug)]
pub struct GoModule {
    /// The declared module path, or a directory-derived fallback.
    pub name: String,

    /// The directory containing the manifest.
    pub root: Utf8PathBuf,

    /// Packages owned by this module, sorted by display name.
    pub packages: Vec<GoPackage>,
}

/// A package: a directory-scoped grouping of test files.
#[derive(Clone, Debug)]
pub struct GoPackage {
    /// The absolute package directory.
    pub path: Utf8PathBuf,

    /// The import-path-relative display string, or the declared package name
    /// for the module root directory.
    pub display_name: String,

    /// Test files in this package, sorted by base name.
    pub files: Vec<TestFile>,
}

/// One test file.
#[derive(Clone, Debug)]
pub struct TestFile {
    /// The absolute path to the file.
    pub path: Utf8PathBuf,

    /// The absolute package directory, duplicated here for status lookups.
    pub package_path: Utf8PathBuf,

    /// Top-level tests in source order.
    pub tests: Vec<TestCase>,
}

/// A top-level test function.
#[derive(Clone, Debug)]
pub struct TestCase {
    /// The function name.
    pub name: String,

    /// The 1-based declaration line.
    pub line: usize,

    /// The file defining this test.
    pub file: Utf8PathBuf,

    /// The absolute package directory.
    pub package_path: Utf8PathBuf,

    /// The last observed status, if any.
    pub status: Option<TestStatus>,

    /// The duration of the last completed run, if any.
    pub duration: Option<Duration>,

    /// Sub-tests. `None` means the test is plain and never expandable;
    /// `Some(vec![])` means a table-driven pattern was detected and concrete
    /// names arrive from run output; `Some(non-empty)` lists known sub-tests.
    pub sub_tests: Option<Vec<SubTest>>,
}

/// A sub-test produced by a run-helper call inside a test.
#[derive(Clone, Debug)]
pub struct SubTest {
    /// The display name (spaces preserved).
    pub name: String,

    /// The run-matching form, `Parent/raw_name`.
    pub full_name: String,

    /// The parent test's function name.
    pub parent_name: String,

    /// The 1-based line the name was recovered from, when statically known.
    pub line: Option<usize>,

    /// The file defining the parent test.
    pub file: Utf8PathBuf,

    /// The absolute package directory.
    pub package_path: Utf8PathBuf,

    /// The last observed status, if any.
    pub status: Option<TestStatus>,

    /// The duration of the last completed run, if any.
    pub duration: Option<Duration>,
}

impl TestList {
    /// Builds the full hierarchy from scanned files and the modules resolved
    /// for them.
    ///
    /// Files are grouped into packages by directory; each package is assigned
    /// to the module whose root is the longest ancestor among `modules`
    /// (first-longest wins on ties). Modules sharing a root are deduplicated,
    /// first one wins. Ordering is plain lexicographic at every level.
    pub fn build(modules: Vec<DiscoveredModule>, files: Vec<ScannedFile>) -> Self {
        let mut unique_modules: Vec<DiscoveredModule> = Vec::with_capacity(modules.len());
        for module in modules {
            if !unique_modules.iter().any(|m| m.root == module.root) {
                unique_modules.push(module);
            }
        }

        let mut by_package: BTreeMap<Utf8PathBuf, Vec<ScannedFile>> = BTreeMap::new();
        for file in files {
            let Some(package_dir) = file.path.parent().map(Utf8Path::to_owned) else {
                warn!("file {} has no parent directory, skipping", file.path);
                continue;
            };
            by_package.entry(package_dir).or_default().push(file);
        }

        let mut grouped: BTreeMap<Utf8PathBuf, GoModule> = BTreeMap::new();
        let mut test_count = 0;

        for (package_dir, mut package_files) in by_package {
            let Some(owner) = owning_module(&unique_modules, &package_dir) else {
                warn!("no module owns package {package_dir}, skipping");
                continue;
            };

            package_files.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));

            let display_name = package_display_name(owner, &package_dir, &package_files);
            let files = package_files
                .into_iter()
                .map(|file| {
                    let tests = build_tests(&file, &package_dir);
                    test_count += tests.len();
                    TestFile {
                        path: file.path,
                        package_path: package_dir.clone(),
                        tests,
                    }
                })
                .collect();

            grouped
                .entry(owner.root.clone())
                .or_insert_with(|| GoModule {
                    name: owner.name.clone(),
                    root: owner.root.clone(),
                    packages: Vec::new(),
                })
                .packages
                .push(GoPackage {
                    path: package_dir,
                    display_name,
                    files,
                });
        }

        let mut modules: Vec<GoModule> = grouped.into_values().collect();
        for module in &mut modules {
            module
                .packages
                .sort_by(|a, b| a.display_name.cmp(&b.display_name));
        }
        modules.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            modules,
            test_count,
        }
    }

    /// Returns the modules in display order.
    pub fn modules(&self) -> &[GoModule] {
        &self.modules
    }

    /// Returns the total number of top-level tests.
    pub fn test_count(&self) -> usize {
        self.test_count
    }

    /// Iterates over all top-level tests in traversal order.
    pub fn iter_tests(&self) -> impl Iterator<Item = &TestCase> + '_ {
        self.modules
            .iter()
            .flat_map(|module| &module.packages)
            .flat_map(|package| &package.files)
            .flat_map(|file| &file.tests)
    }

    /// Finds the first test with the given name inside the given package,
    /// searching modules → packages → files in traversal order.
    ///
    /// Duplicate names within one package resolve to the first match; this is
    /// a documented limitation.
    pub(crate) fn find_test_mut(
        &mut self,
        package_path: &Utf8Path,
        name: &str,
    ) -> Option<&mut TestCase> {
        self.tests_scoped_mut(Some(package_path))
            .find(|test| test.name == name)
    }

    /// Finds a sub-test by its run-matching full name inside the given
    /// package, narrowed to parents with the given name.
    pub(crate) fn find_sub_test_mut(
        &mut self,
        package_path: &Utf8Path,
        parent_name: &str,
        full_name: &str,
    ) -> Option<&mut SubTest> {
        self.tests_scoped_mut(Some(package_path))
            .filter(|test| test.name == parent_name)
            .filter_map(|test| test.sub_tests.as_mut())
            .flat_map(|subs| subs.iter_mut())
            .find(|sub| sub.full_name == full_name)
    }

    /// Iterates mutably over tests, restricted to one package when a scope is
    /// given.
    pub(crate) fn tests_scoped_mut<'a>(
        &'a mut self,
        scope: Option<&Utf8Path>,
    ) -> Box<dyn Iterator<Item = &'a mut TestCase> + 'a> {
        let scope = scope.map(Utf8Path::to_owned);
        Box::new(
            self.modules
                .iter_mut()
                .flat_map(|module| module.packages.iter_mut())
                .filter(move |package| {
                    scope
                        .as_deref()
                        .is_none_or(|scope| package.path == scope)
                })
                .flat_map(|package| package.files.iter_mut())
                .flat_map(|file| file.tests.iter_mut()),
        )
    }

    /// Converts the list to a serializable summary.
    pub fn to_summary(&self) -> TestListSummary {
        TestListSummary {
            test_count: self.test_count,
            modules: self
                .modules
                .iter()
                .map(|module| ModuleSummary {
                    name: module.name.clone(),
                    root: module.root.clone(),
                    packages: module
                        .packages
                        .iter()
                        .map(|package| PackageSummary {
                            path: package.path.clone(),
                            display_name: package.display_name.clone(),
                            files: package.files.iter().map(file_summary).collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Writes the list out in human-readable form.
    pub fn write_human(&self, styles: &Styles, writer: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            writer,
            "{} {} across {} {}",
            self.test_count.style(styles.count),
            plural::tests_str(self.test_count),
            self.modules.len().style(styles.count),
            if self.modules.len() == 1 {
                "module"
            } else {
                "modules"
            },
        )?;
        for module in &self.modules {
            writeln!(writer, "{}", module.name.style(styles.module))?;
            for package in &module.packages {
                writeln!(writer, "  {}", package.display_name.style(styles.package))?;
                for file in &package.files {
                    let base = file.path.file_name().unwrap_or(file.path.as_str());
                    writeln!(writer, "    {}", base.style(styles.file))?;
                    for test in &file.tests {
                        write!(writer, "      {}", test.name)?;
                        write_status(writer, styles, test.status, test.duration)?;
                        writeln!(writer)?;
                        match &test.sub_tests {
                            None => {}
                            Some(subs) if subs.is_empty() => {
                                writeln!(writer, "        (run to discover sub-tests)")?;
                            }
                            Some(subs) => {
                                for sub in subs {
                                    write!(writer, "        {}", sub.name)?;
                                    write_status(writer, styles, sub.status, sub.duration)?;
                                    writeln!(writer)?;
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

fn write_status(
    writer: &mut dyn fmt::Write,
    styles: &Styles,
    status: Option<TestStatus>,
    duration: Option<Duration>,
) -> fmt::Result {
    if let Some(status) = status {
        let style = styles.for_status(status);
        write!(writer, " [{}]", status.style(style))?;
    }
    if let Some(duration) = duration {
        write!(writer, " ({})", display_duration(duration))?;
    }
    Ok(())
}

/// Picks the module owning a package directory: the candidate whose root is
/// an ancestor with the longest path, first-longest winning ties.
fn owning_module<'a>(
    modules: &'a [DiscoveredModule],
    package_dir: &Utf8Path,
) -> Option<&'a DiscoveredModule> {
    let mut best: Option<&DiscoveredModule> = None;
    for module in modules {
        if !package_dir.starts_with(&module.root) {
            continue;
        }
        let longer = match best {
            Some(current) => module.root.as_str().len() > current.root.as_str().len(),
            None => true,
        };
        if longer {
            best = Some(module);
        }
    }
    best
}

fn package_display_name(
    module: &DiscoveredModule,
    package_dir: &Utf8Path,
    files: &[ScannedFile],
) -> String {
    match package_dir.strip_prefix(&module.root) {
        Ok(relative) if !relative.as_str().is_empty() => relative.as_str().to_owned(),
        _ => {
            // Module root package: use the declared package clause.
            files
                .iter()
                .find_map(|file| file.result.package_clause.clone())
                .unwrap_or_else(|| {
                    package_dir
                        .file_name()
                        .unwrap_or(package_dir.as_str())
                        .to_owned()
                })
        }
    }
}

fn build_tests(file: &ScannedFile, package_dir: &Utf8Path) -> Vec<TestCase> {
    file.result
        .tests
        .iter()
        .map(|test| TestCase {
            name: test.name.clone(),
            line: test.line,
            file: file.path.clone(),
            package_path: package_dir.to_owned(),
            status: None,
            duration: None,
            sub_tests: test.sub_tests.as_ref().map(|subs| {
                subs.iter()
                    .map(|sub| SubTest {
                        name: sub.name.clone(),
                        full_name: format!("{}/{}", test.name, sub.run_name),
                        parent_name: test.name.clone(),
                        line: sub.line,
                        file: file.path.clone(),
                        package_path: package_dir.to_owned(),
                        status: None,
                        duration: None,
                    })
                    .collect()
            }),
        })
        .collect()
}

fn file_summary(file: &TestFile) -> FileSummary {
    FileSummary {
        path: file.path.clone(),
        tests: file
            .tests
            .iter()
            .map(|test| TestSummary {
                name: test.name.clone(),
                line: test.line,
                status: test.status,
                duration_secs: duration_secs(test.duration),
                sub_tests: test.sub_tests.as_ref().map(|subs| {
                    subs.iter()
                        .map(|sub| SubTestSummary {
                            name: sub.name.clone(),
                            full_name: sub.full_name.clone(),
                            line: sub.line,
                            status: sub.status,
                            duration_secs: duration_secs(sub.duration),
                        })
                        .collect()
                }),
            })
            .collect(),
    }
}

/// Styles for human-readable list output.
#[derive(Clone, Debug, Default)]
pub struct Styles {
    pub(crate) count: Style,
    pub(crate) module: Style,
    pub(crate) package: Style,
    pub(crate) file: Style,
    pub(crate) pass: Style,
    pub(crate) fail: Style,
    pub(crate) skip: Style,
    pub(crate) running: Style,
    pub(crate) unknown: Style,
}

impl Styles {
    /// Enables colorized output.
    pub fn colorize(&mut self) {
        self.count = Style::new().bold();
        self.module = Style::new().magenta().bold();
        self.package = Style::new().blue().bold();
        self.file = Style::new().cyan();
        self.pass = Style::new().green();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().yellow();
        self.running = Style::new().yellow().bold();
        self.unknown = Style::new().dimmed();
    }

    pub(crate) fn for_status(&self, status: TestStatus) -> Style {
        match status {
            TestStatus::Passed => self.pass,
            TestStatus::Failed => self.fail,
            TestStatus::Skipped => self.skip,
            TestStatus::Running => self.running,
            TestStatus::Unknown => self.unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{ScanResult, ScannedSubTest, ScannedTest};
    use pretty_assertions::assert_eq;

    fn module(name: &str, root: &str) -> DiscoveredModule {
        DiscoveredModule {
            name: name.to_owned(),
            root: root.into(),
        }
    }

    fn file(path: &str, package_clause: Option<&str>, tests: &[&str]) -> ScannedFile {
        ScannedFile {
            path: path.into(),
            result: ScanResult {
                package_clause: package_clause.map(str::to_owned),
                tests: tests
                    .iter()
                    .enumerate()
                    .map(|(i, name)| ScannedTest {
                        name: (*name).to_owned(),
                        line: i * 5 + 1,
                        sub_tests: None,
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn longest_prefix_assignment() {
        let modules = vec![
            module("outer", "/work/outer"),
            module("inner", "/work/outer/inner"),
        ];
        let files = vec![
            file("/work/outer/a_test.go", Some("outer"), &["TestA"]),
            file("/work/outer/inner/b_test.go", Some("inner"), &["TestB"]),
            file("/work/outer/inner/deep/c_test.go", None, &["TestC"]),
        ];

        let list = TestList::build(modules, files);
        assert_eq!(list.test_count(), 3);

        let by_name: Vec<(&str, Vec<&str>)> = list
            .modules()
            .iter()
            .map(|m| {
                (
                    m.name.as_str(),
                    m.packages
                        .iter()
                        .map(|p| p.display_name.as_str())
                        .collect(),
                )
            })
            .collect();
        assert_eq!(
            by_name,
            vec![
                ("inner", vec!["deep", "inner"]),
                ("outer", vec!["outer"]),
            ],
        );
    }

    #[test]
    fn duplicate_module_roots_first_wins() {
        let modules = vec![
            module("first", "/work/mod"),
            module("second", "/work/mod"),
        ];
        let files = vec![file("/work/mod/a_test.go", Some("mod"), &["TestA"])];

        let list = TestList::build(modules, files);
        assert_eq!(list.modules().len(), 1);
        assert_eq!(list.modules()[0].name, "first");
    }

    #[test]
    fn ordering_is_lexicographic() {
        let modules = vec![module("m", "/m")];
        let files = vec![
            file("/m/zeta/z_test.go", None, &["TestZ"]),
            file("/m/alpha/b_test.go", None, &["TestB"]),
            file("/m/alpha/a_test.go", None, &["TestA"]),
        ];

        let list = TestList::build(modules, files);
        let packages: Vec<&str> = list.modules()[0]
            .packages
            .iter()
            .map(|p| p.display_name.as_str())
            .collect();
        assert_eq!(packages, ["alpha", "zeta"]);

        let alpha_files: Vec<&str> = list.modules()[0].packages[0]
            .files
            .iter()
            .map(|f| f.path.file_name().unwrap())
            .collect();
        assert_eq!(alpha_files, ["a_test.go", "b_test.go"]);
    }

    #[test]
    fn root_package_uses_declared_clause() {
        let modules = vec![module("github.com/acme/widget", "/w")];
        let files = vec![file("/w/widget_test.go", Some("widget"), &["TestW"])];

        let list = TestList::build(modules, files);
        assert_eq!(list.modules()[0].packages[0].display_name, "widget");
    }

    #[test]
    fn sub_test_full_names() {
        let modules = vec![module("m", "/m")];
        let mut scanned = file("/m/a_test.go", None, &[]);
        scanned.result.tests.push(ScannedTest {
            name: "TestTable".to_owned(),
            line: 3,
            sub_tests: Some(vec![ScannedSubTest::new("first case", 4)]),
        });

        let mut list = TestList::build(modules, vec![scanned]);
        let sub = list
            .find_sub_test_mut(Utf8Path::new("/m"), "TestTable", "TestTable/first_case")
            .unwrap();
        assert_eq!(sub.name, "first case");
        assert_eq!(sub.parent_name, "TestTable");
    }

    #[test]
    fn find_test_is_package_scoped() {
        let modules = vec![module("m", "/m")];
        let files = vec![
            file("/m/one/a_test.go", None, &["TestSame"]),
            file("/m/two/a_test.go", None, &["TestSame"]),
        ];
        let mut list = TestList::build(modules, files);

        let found = list.find_test_mut(Utf8Path::new("/m/one"), "TestSame").unwrap();
        assert_eq!(found.package_path, Utf8Path::new("/m/one"));
        assert!(
            list.find_test_mut(Utf8Path::new("/m/three"), "TestSame")
                .is_none()
        );
    }
}
