// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{FileScanner, ScanResult, ScannedSubTest, ScannedTest};
use regex::Regex;
use std::sync::LazyLock;

static FUNC_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^func\s+((?:Test|Benchmark|Example|Fuzz)[A-Z]\w*)\s*\(").expect("valid regex")
});

static PACKAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^package\s+(\w+)").expect("valid regex"));

static LITERAL_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\.Run\(\s*"([^"]*)""#).expect("valid regex"));

static VARIABLE_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\.Run\(\s*[^"\s)]"#).expect("valid regex"));

static NAME_FIELD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bname:\s*(?:"([^"]*)"|`([^`]*)`)"#).expect("valid regex"));

/// The default, regex-based scanner.
///
/// Boundaries are recovered by tracking nested-brace depth from each matching
/// declaration line until it returns to zero. Comment-only lines are skipped
/// entirely, including for brace counting. Braces inside string literals do
/// skew the depth; gofmt-formatted sources don't hit this in practice.
#[derive(Clone, Debug, Default)]
pub struct HeuristicScanner;

impl HeuristicScanner {
    /// Creates a new heuristic scanner.
    pub fn new() -> Self {
        Self
    }
}

impl FileScanner for HeuristicScanner {
    fn scan(&self, contents: &str) -> ScanResult {
        let lines: Vec<&str> = contents.lines().collect();
        let mut result = ScanResult::default();

        // Body currently being tracked: (declaration index, name, depth,
        // whether an opening brace has been seen).
        let mut tracked: Option<(usize, String, i32, bool)> = None;

        for (index, line) in lines.iter().enumerate() {
            if is_comment_only(line) {
                continue;
            }

            match &mut tracked {
                Some((start, name, depth, entered)) => {
                    // A nested declaration inside a tracked body is part of
                    // that body, not a new test.
                    update_depth(line, depth, entered);
                    if *entered && *depth <= 0 {
                        let test = scan_body(name, *start, &lines[*start..=index]);
                        result.tests.push(test);
                        tracked = None;
                    }
                }
                None => {
                    if result.package_clause.is_none()
                        && let Some(captures) = PACKAGE_RE.captures(line)
                    {
                        result.package_clause = Some(captures[1].to_owned());
                        continue;
                    }

                    if let Some(captures) = FUNC_RE.captures(line) {
                        let name = captures[1].to_owned();
                        let mut depth = 0;
                        let mut entered = false;
                        update_depth(line, &mut depth, &mut entered);
                        if entered && depth <= 0 {
                            // Single-line body.
                            let test = scan_body(&name, index, &lines[index..=index]);
                            result.tests.push(test);
                        } else {
                            tracked = Some((index, name, depth, entered));
                        }
                    }
                }
            }
        }

        // An unterminated body (unbalanced braces) still counts as a test; it
        // just has no recoverable sub-tests past the end of the file.
        if let Some((start, name, _, _)) = tracked {
            let test = scan_body(&name, start, &lines[start..]);
            result.tests.push(test);
        }

        result
    }
}

fn is_comment_only(line: &str) -> bool {
    line.trim_start().starts_with("//")
}

fn update_depth(line: &str, depth: &mut i32, entered: &mut bool) {
    for c in line.chars() {
        match c {
            '{' => {
                *depth += 1;
                *entered = true;
            }
            '}' => *depth -= 1,
            _ => {}
        }
    }
}

/// Recovers sub-tests from one function body.
///
/// `start` is the 0-based index of the declaration line within the file;
/// `body` is the slice of lines from the declaration through the closing
/// brace.
fn scan_body(name: &str, start: usize, body: &[&str]) -> ScannedTest {
    let mut literals = Vec::new();
    let mut variable_call = false;

    for (offset, line) in body.iter().enumerate() {
        if is_comment_only(line) {
            continue;
        }
        for captures in LITERAL_RUN_RE.captures_iter(line) {
            literals.push(ScannedSubTest::new(&captures[1], start + offset + 1));
        }
        if !variable_call && VARIABLE_RUN_RE.is_match(line) {
            variable_call = true;
        }
    }

    let sub_tests = if !literals.is_empty() {
        Some(literals)
    } else if variable_call {
        // Table-driven loop: fall back to `name:` fields of the case table,
        // in textual order. No recovered names still yields an (empty) list,
        // which marks the test as pending dynamic discovery.
        let mut named = Vec::new();
        for (offset, line) in body.iter().enumerate() {
            if is_comment_only(line) {
                continue;
            }
            for captures in NAME_FIELD_RE.captures_iter(line) {
                let name = captures
                    .get(1)
                    .or_else(|| captures.get(2))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                named.push(ScannedSubTest::new(name, start + offset + 1));
            }
        }
        Some(named)
    } else {
        None
    };

    ScannedTest {
        name: name.to_owned(),
        line: start + 1,
        sub_tests,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use test_strategy::proptest;

    fn scan(contents: &str) -> ScanResult {
        HeuristicScanner::new().scan(contents)
    }

    #[test]
    fn top_level_functions_with_nested_braces() {
        let source = indoc! {r#"
            package widget

            func TestAlpha(t *testing.T) {
                if x := compute(); x > 0 {
                    for i := 0; i < x; i++ {
                        check(t, i)
                    }
                }
            }

            func helperNotATest() {
                doStuff()
            }

            func BenchmarkBeta(b *testing.B) {
                m := map[string]int{"a": 1}
                _ = m
            }

            func TestGamma(t *testing.T) {}
        "#};

        let result = scan(source);
        assert_eq!(result.package_clause.as_deref(), Some("widget"));
        let names: Vec<_> = result.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["TestAlpha", "BenchmarkBeta", "TestGamma"]);
        let lines: Vec<_> = result.tests.iter().map(|t| t.line).collect();
        assert_eq!(lines, [3, 15, 20]);
        assert!(result.tests.iter().all(|t| t.sub_tests.is_none()));
    }

    #[test]
    fn lowercase_after_prefix_is_not_a_test() {
        let source = "package p\n\nfunc Testify(t *testing.T) {\n}\n";
        assert_eq!(scan(source).tests, vec![]);
    }

    #[test]
    fn comment_only_lines_are_skipped() {
        let source = indoc! {r#"
            package p

            // func TestCommented(t *testing.T) {
            func TestReal(t *testing.T) {
                // stray close brace in comment: }
                use(t)
            }
        "#};

        let result = scan(source);
        assert_eq!(result.tests.len(), 1);
        assert_eq!(result.tests[0].name, "TestReal");
        assert_eq!(result.tests[0].line, 4);
    }

    #[test]
    fn nested_declaration_is_not_tracked_separately() {
        let source = indoc! {r#"
            package p

            func TestOuter(t *testing.T) {
                run := func TestInner() {
                    work()
                }
                run()
            }
        "#};

        let result = scan(source);
        let names: Vec<_> = result.tests.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["TestOuter"]);
    }

    #[test]
    fn literal_sub_tests_in_source_order() {
        let source = indoc! {r#"
            package p

            func TestTable(t *testing.T) {
                t.Run("first case", check)
                t.Run("second", check); t.Run("third case", check)
            }
        "#};

        let result = scan(source);
        let subs = result.tests[0].sub_tests.as_ref().unwrap();
        let names: Vec<_> = subs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["first case", "second", "third case"]);
        let run_names: Vec<_> = subs.iter().map(|s| s.run_name.as_str()).collect();
        assert_eq!(run_names, ["first_case", "second", "third_case"]);
        assert_eq!(subs[0].line, Some(4));
        assert_eq!(subs[1].line, Some(5));
        assert_eq!(subs[2].line, Some(5));
    }

    #[test]
    fn table_driven_name_fields() {
        let source = indoc! {r#"
            package p

            func TestMatrix(t *testing.T) {
                cases := []struct {
                    name string
                    in   int
                }{
                    {name: "A", in: 1},
                    {name: "B", in: 2},
                }
                for _, tc := range cases {
                    t.Run(tc.name, func(t *testing.T) {
                        use(tc.in)
                    })
                }
            }
        "#};

        let result = scan(source);
        let subs = result.tests[0].sub_tests.as_ref().unwrap();
        let names: Vec<_> = subs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn variable_run_without_names_yields_empty_list() {
        let source = indoc! {r#"
            package p

            func TestDynamic(t *testing.T) {
                for _, tc := range load() {
                    t.Run(tc.Label, run)
                }
            }
        "#};

        let result = scan(source);
        assert_eq!(result.tests[0].sub_tests, Some(vec![]));
    }

    #[test]
    fn no_run_call_yields_no_list() {
        let source = "package p\n\nfunc TestPlain(t *testing.T) {\n\tuse(t)\n}\n";
        let result = scan(source);
        assert_eq!(result.tests[0].sub_tests, None);
    }

    #[test]
    fn literal_calls_win_over_table_fields() {
        let source = indoc! {r#"
            package p

            func TestMixed(t *testing.T) {
                cases := []tc{{name: "ignored"}}
                t.Run("explicit", check)
                for _, c := range cases {
                    t.Run(c.name, check)
                }
            }
        "#};

        let result = scan(source);
        let subs = result.tests[0].sub_tests.as_ref().unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].name, "explicit");
    }

    #[test]
    fn backquoted_name_fields() {
        let source = indoc! {r#"
            package p

            func TestQuoting(t *testing.T) {
                cases := []tc{{name: `raw name`}}
                for _, c := range cases {
                    t.Run(c.name, check)
                }
            }
        "#};

        let result = scan(source);
        let subs = result.tests[0].sub_tests.as_ref().unwrap();
        assert_eq!(subs[0].name, "raw name");
        assert_eq!(subs[0].run_name, "raw_name");
    }

    #[test]
    fn unterminated_body_still_counts() {
        let source = "package p\n\nfunc TestTruncated(t *testing.T) {\n\tuse(t)\n";
        let result = scan(source);
        assert_eq!(result.tests.len(), 1);
        assert_eq!(result.tests[0].name, "TestTruncated");
    }

    #[proptest(cases = 64)]
    fn balanced_functions_all_found(
        #[strategy(proptest::collection::vec(0usize..4, 1..8))] nestings: Vec<usize>,
    ) {
        use std::fmt::Write as _;

        let mut source = String::from("package p\n\n");
        let mut expected_lines = Vec::new();
        for (i, nesting) in nestings.iter().enumerate() {
            expected_lines.push(source.lines().count() + 1);
            writeln!(source, "func TestCase{i}(t *testing.T) {{").unwrap();
            for depth in 0..*nesting {
                writeln!(source, "{}if true {{", "\t".repeat(depth + 1)).unwrap();
            }
            for depth in (0..*nesting).rev() {
                writeln!(source, "{}}}", "\t".repeat(depth + 1)).unwrap();
            }
            source.push_str("}\n\n");
        }

        let result = scan(&source);
        prop_assert_eq!(result.tests.len(), nestings.len());
        let lines: Vec<_> = result.tests.iter().map(|t| t.line).collect();
        prop_assert_eq!(lines, expected_lines);
    }
}
