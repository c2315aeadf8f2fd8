// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of `go test` transcripts.
//!
//! A transcript is the concatenated stdout/stderr text of one test run. It is
//! the only source of truth for sub-tests produced by table-driven loops
//! whose names cannot be recovered statically. Two line shapes matter:
//!
//! ```text
//! === RUN   TestFoo/with_underscores
//!     --- PASS: TestFoo/with_underscores (0.01s)
//! ```
//!
//! A start marker records the pair with no outcome yet; a result marker
//! overwrites or adds the outcome and duration. A transcript matching no
//! patterns yields an empty [`RunOutput`], never an error.

use indexmap::IndexMap;
use regex::Regex;
use std::{sync::LazyLock, time::Duration};

static RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=== RUN\s+(\S+)").expect("valid regex"));

static RESULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*--- (PASS|FAIL|SKIP): (\S+) \((\d+(?:\.\d+)?)s\)").expect("valid regex")
});

/// The outcome token of a result marker.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RunOutcome {
    /// `--- PASS:`
    Passed,
    /// `--- FAIL:`
    Failed,
    /// `--- SKIP:`
    Skipped,
}

/// What a transcript revealed about one test or sub-test.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RunRecord {
    /// The outcome, if a result marker was seen. A start marker alone leaves
    /// this unset.
    pub outcome: Option<RunOutcome>,

    /// The reported duration, if a result marker was seen.
    pub duration: Option<Duration>,
}

/// Everything recovered from one transcript.
///
/// Iteration order of all maps is the order of first appearance in the
/// transcript.
#[derive(Clone, Debug, Default)]
pub struct RunOutput {
    sub_tests: IndexMap<String, IndexMap<String, RunRecord>>,
    top_level: IndexMap<String, RunRecord>,
}

impl RunOutput {
    /// Scans a transcript for start and result markers.
    pub fn parse(transcript: &str) -> Self {
        let mut output = Self::default();

        for line in transcript.lines() {
            if let Some(captures) = RUN_RE.captures(line) {
                output.record(&captures[1], None, None);
            } else if let Some(captures) = RESULT_RE.captures(line) {
                let outcome = match &captures[1] {
                    "PASS" => RunOutcome::Passed,
                    "FAIL" => RunOutcome::Failed,
                    _ => RunOutcome::Skipped,
                };
                let duration = captures[3].parse::<f64>().ok().map(Duration::from_secs_f64);
                output.record(&captures[2], Some(outcome), duration);
            }
        }

        output
    }

    fn record(&mut self, full_name: &str, outcome: Option<RunOutcome>, duration: Option<Duration>) {
        let record = match full_name.split_once('/') {
            Some((parent, raw_sub)) => self
                .sub_tests
                .entry(parent.to_owned())
                .or_default()
                .entry(raw_sub.to_owned())
                .or_default(),
            None => self.top_level.entry(full_name.to_owned()).or_default(),
        };
        if outcome.is_some() {
            record.outcome = outcome;
            record.duration = duration;
        }
    }

    /// Returns true if the transcript matched no patterns at all.
    pub fn is_empty(&self) -> bool {
        self.sub_tests.is_empty() && self.top_level.is_empty()
    }

    /// Sub-test records, keyed by parent test name then raw sub-test name.
    pub fn sub_tests(&self) -> &IndexMap<String, IndexMap<String, RunRecord>> {
        &self.sub_tests
    }

    /// Records for top-level tests (names without a `/`).
    pub fn top_level(&self) -> &IndexMap<String, RunRecord> {
        &self.top_level
    }
}
