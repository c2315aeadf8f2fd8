// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A bounded, append-only ledger of past run outcomes.

use crate::{
    helpers::{display_duration, plural, serde_duration_secs},
    list::Styles,
    status::TestStatus,
};
use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::{fmt, time::Duration};

/// The maximum number of entries the ledger retains. Oldest entries are
/// evicted first.
pub const MAX_RUN_HISTORY: usize = 10;

/// One test outcome within a recorded run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunResult {
    /// The test (or sub-test full) name.
    pub test_name: String,

    /// The absolute package directory.
    pub package_path: Utf8PathBuf,

    /// The file defining the test.
    pub file: Utf8PathBuf,

    /// The outcome.
    pub status: TestStatus,

    /// The duration, if one was reported.
    #[serde(with = "serde_duration_secs", default)]
    pub duration: Option<Duration>,
}

/// One recorded run. Immutable once created; removed only by eviction or an
/// explicit clear.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunHistoryEntry {
    /// A timestamp-derived identifier.
    pub id: String,

    /// The display label, `"<timestamp> · <label>"`.
    pub label: String,

    /// When the run was recorded.
    pub timestamp: DateTime<Utc>,

    results: Vec<RunResult>,
}

impl RunHistoryEntry {
    /// The run's results, ordered for display: failing first, inconclusive
    /// second, passing last.
    pub fn results(&self) -> &[RunResult] {
        &self.results
    }
}

/// A serializable view of the ledger, most recent first.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunHistorySummary {
    /// Recorded runs in display order, most recent first.
    pub runs: Vec<RunHistoryEntry>,
}

/// The bounded run ledger.
#[derive(Clone, Debug, Default)]
pub struct RunHistory {
    entries: Vec<RunHistoryEntry>,
}

impl RunHistory {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one run to the ledger.
    ///
    /// A run with no results is not recorded. If recording pushes the ledger
    /// past [`MAX_RUN_HISTORY`], the oldest entries are discarded from the
    /// front. Returns the recorded entry, if any.
    pub fn record(
        &mut self,
        label: &str,
        mut results: Vec<RunResult>,
        now: DateTime<Utc>,
    ) -> Option<&RunHistoryEntry> {
        if results.is_empty() {
            return None;
        }

        results.sort_by_key(|result| result.status.display_rank());

        self.entries.push(RunHistoryEntry {
            id: format!("run-{}", now.format("%Y%m%dT%H%M%S%.3f")),
            label: format!("{} · {label}", now.format("%H:%M:%S")),
            timestamp: now,
            results,
        });

        if self.entries.len() > MAX_RUN_HISTORY {
            let excess = self.entries.len() - MAX_RUN_HISTORY;
            self.entries.drain(..excess);
        }

        self.entries.last()
    }

    /// Entries in insertion order, oldest first.
    pub fn entries(&self) -> &[RunHistoryEntry] {
        &self.entries
    }

    /// Entries for display, most recent first.
    pub fn entries_recent_first(&self) -> impl Iterator<Item = &RunHistoryEntry> + '_ {
        self.entries.iter().rev()
    }

    /// Returns the number of recorded runs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes all recorded runs.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Converts the ledger to a serializable summary.
    pub fn to_summary(&self) -> RunHistorySummary {
        RunHistorySummary {
            runs: self.entries_recent_first().cloned().collect(),
        }
    }

    /// Writes the ledger out in human-readable form, most recent first.
    pub fn write_human(&self, styles: &Styles, writer: &mut dyn fmt::Write) -> fmt::Result {
        writeln!(
            writer,
            "{} recorded {}",
            self.entries.len().style(styles.count),
            plural::runs_str(self.entries.len()),
        )?;
        for entry in self.entries_recent_first() {
            writeln!(writer, "{}", entry.label.style(styles.module))?;
            for result in entry.results() {
                let style = styles.for_status(result.status);
                write!(
                    writer,
                    "  {} {}",
                    result.status.style(style),
                    result.test_name,
                )?;
                if let Some(duration) = result.duration {
                    write!(writer, " ({})", display_duration(duration))?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }
}
