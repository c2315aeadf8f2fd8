// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persisted selection of `go test` flags.
//!
//! The store remembers which flags the user has switched on and any free-text
//! values for flags that take one, across sessions. A separately persisted
//! "seen" set records which flag identifiers an installation has already been
//! offered: a flag introduced later with `default_active` set is switched on
//! automatically for existing stores, while flags the user explicitly
//! deselected stay off.

use crate::errors::FlagStoreError;
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    io::{self, Write},
};
use tracing::{debug, warn};

/// The identifier of the run-filter flag, which is suppressed when a caller
/// composes an invocation with its own filter pattern.
pub const RUN_FILTER_FLAG: &str = "run";

/// A known `go test` flag.
#[derive(Clone, Copy, Debug)]
pub struct FlagSpec {
    /// Stable identifier, used as the persistence key.
    pub id: &'static str,

    /// The literal token passed to `go test`.
    pub token: &'static str,

    /// Whether the flag takes a value.
    pub requires_value: bool,

    /// The value used when the flag is active but the user stored none.
    pub default_value: Option<&'static str>,

    /// Whether the flag is switched on for installations that have not seen
    /// it yet.
    pub default_active: bool,

    /// One-line description for display.
    pub description: &'static str,
}

/// All flags the store knows about, in composition order.
pub fn known_flags() -> &'static [FlagSpec] {
    KNOWN_FLAGS
}

static KNOWN_FLAGS: &[FlagSpec] = &[
    FlagSpec {
        id: "verbose",
        token: "-v",
        requires_value: false,
        default_value: None,
        default_active: true,
        description: "log all tests as they run",
    },
    FlagSpec {
        id: RUN_FILTER_FLAG,
        token: "-run",
        requires_value: true,
        default_value: None,
        default_active: false,
        description: "only run tests matching a regular expression",
    },
    FlagSpec {
        id: "timeout",
        token: "-timeout",
        requires_value: true,
        default_value: Some("30s"),
        default_active: true,
        description: "panic if a test runs longer than this duration",
    },
    FlagSpec {
        id: "count",
        token: "-count",
        requires_value: true,
        default_value: Some("1"),
        default_active: false,
        description: "run each test N times, disabling the test cache",
    },
    FlagSpec {
        id: "race",
        token: "-race",
        requires_value: false,
        default_value: None,
        default_active: false,
        description: "enable the data race detector",
    },
    FlagSpec {
        id: "cover",
        token: "-cover",
        requires_value: false,
        default_value: None,
        default_active: false,
        description: "enable coverage analysis",
    },
    FlagSpec {
        id: "short",
        token: "-short",
        requires_value: false,
        default_value: None,
        default_active: false,
        description: "tell long-running tests to shorten themselves",
    },
    FlagSpec {
        id: "failfast",
        token: "-failfast",
        requires_value: false,
        default_value: None,
        default_active: false,
        description: "stop after the first test failure",
    },
    FlagSpec {
        id: "shuffle",
        token: "-shuffle",
        requires_value: true,
        default_value: Some("on"),
        default_active: false,
        description: "randomize test execution order",
    },
    FlagSpec {
        id: "tags",
        token: "-tags",
        requires_value: true,
        default_value: None,
        default_active: false,
        description: "comma-separated build tags",
    },
];

fn flag_spec(id: &str) -> Option<&'static FlagSpec> {
    KNOWN_FLAGS.iter().find(|spec| spec.id == id)
}

/// The on-disk shape of the store.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct PersistedFlags {
    #[serde(default)]
    active: BTreeSet<String>,
    #[serde(default)]
    values: BTreeMap<String, String>,
    #[serde(default)]
    seen: BTreeSet<String>,
}

/// The persisted flag-selection store.
///
/// Reads its state file at construction and writes it back (atomically) on
/// every change. A missing file means defaults.
#[derive(Debug)]
pub struct FlagStore {
    path: Utf8PathBuf,
    state: PersistedFlags,
}

impl FlagStore {
    /// Loads the store from `path`, creating default state (and the file) if
    /// none exists yet.
    pub fn load(path: impl Into<Utf8PathBuf>) -> Result<Self, FlagStoreError> {
        let path = path.into();
        let state = match std::fs::read_to_string(&path) {
            Ok(contents) => {
                serde_json::from_str(&contents).map_err(|error| FlagStoreError::Deserialize {
                    path: path.clone(),
                    error,
                })?
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => PersistedFlags::default(),
            Err(error) => return Err(FlagStoreError::Read { path, error }),
        };

        let mut store = Self { path, state };
        if store.migrate_new_defaults() {
            store.persist()?;
        }
        Ok(store)
    }

    /// Switches default-active flags on for installations that have never
    /// seen them, then refreshes the seen set. Returns true if anything
    /// changed.
    fn migrate_new_defaults(&mut self) -> bool {
        let mut changed = false;
        for spec in KNOWN_FLAGS {
            if spec.default_active
                && !self.state.seen.contains(spec.id)
                && self.state.active.insert(spec.id.to_owned())
            {
                debug!("activating newly introduced default flag `{}`", spec.id);
                changed = true;
            }
        }
        for spec in KNOWN_FLAGS {
            changed |= self.state.seen.insert(spec.id.to_owned());
        }
        changed
    }

    /// The path of the backing state file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Returns true if the flag is switched on.
    pub fn is_active(&self, id: &str) -> bool {
        self.state.active.contains(id)
    }

    /// The user-stored value for a flag, if any.
    pub fn value(&self, id: &str) -> Option<&str> {
        self.state.values.get(id).map(String::as_str)
    }

    /// Known flags that are currently switched on, in composition order.
    pub fn active_flags(&self) -> impl Iterator<Item = &'static FlagSpec> + '_ {
        KNOWN_FLAGS
            .iter()
            .filter(|spec| self.state.active.contains(spec.id))
    }

    /// Switches a flag on or off and persists the change.
    pub fn set_active(&mut self, id: &str, active: bool) -> Result<(), FlagStoreError> {
        let spec = flag_spec(id).ok_or_else(|| unknown_flag(id))?;
        let changed = if active {
            self.state.active.insert(spec.id.to_owned())
        } else {
            self.state.active.remove(spec.id)
        };
        if changed {
            self.persist()?;
        }
        Ok(())
    }

    /// Stores a flag's free-text value and persists the change.
    pub fn set_value(&mut self, id: &str, value: impl Into<String>) -> Result<(), FlagStoreError> {
        let spec = flag_spec(id).ok_or_else(|| unknown_flag(id))?;
        let value = value.into();
        if !spec.requires_value {
            warn!("flag `{id}` does not take a value; storing anyway");
        }
        let changed = self.state.values.insert(spec.id.to_owned(), value.clone()) != Some(value);
        if changed {
            self.persist()?;
        }
        Ok(())
    }

    /// Composes the argument list for one invocation.
    ///
    /// Each active flag contributes its literal token, with the stored or
    /// default value attached for flags that take one (`-timeout=30s`). When
    /// `filter` is supplied the run-filter flag is suppressed, since the
    /// caller will pass its own pattern. An active valued flag with neither a
    /// stored nor a default value is skipped with a warning.
    pub fn compose(&self, filter: Option<&str>) -> Vec<String> {
        let mut args = Vec::new();
        for spec in self.active_flags() {
            if filter.is_some() && spec.id == RUN_FILTER_FLAG {
                continue;
            }
            if spec.requires_value {
                match self.value(spec.id).or(spec.default_value) {
                    Some(value) => args.push(format!("{}={value}", spec.token)),
                    None => {
                        warn!("flag `{}` requires a value but none is set, skipping", spec.id);
                    }
                }
            } else {
                args.push(spec.token.to_owned());
            }
        }
        args
    }

    /// The composed argument list as one shell-quoted string.
    pub fn compose_string(&self, filter: Option<&str>) -> String {
        shell_words::join(self.compose(filter))
    }

    fn persist(&self) -> Result<(), FlagStoreError> {
        if let Some(parent) = self.path.parent()
            && let Err(error) = std::fs::create_dir_all(parent)
        {
            return Err(FlagStoreError::Write {
                path: self.path.clone(),
                error: atomicwrites::Error::Internal(error),
            });
        }

        // Infallible: serializing a map of strings.
        let json = serde_json::to_string_pretty(&self.state).unwrap_or_default();
        AtomicFile::new(&self.path, OverwriteBehavior::AllowOverwrite)
            .write(|file| file.write_all(json.as_bytes()))
            .map_err(|error| FlagStoreError::Write {
                path: self.path.clone(),
                error,
            })
    }
}

fn unknown_flag(id: &str) -> FlagStoreError {
    FlagStoreError::UnknownFlag {
        id: id.to_owned(),
        known: KNOWN_FLAGS.iter().map(|spec| spec.id).collect(),
    }
}
