// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for locating and reading `go.mod` files.
//!
//! This module contains logic to partially read and understand `go.mod`
//! files: just enough for gotestree's needs. Resolution never fails; a
//! missing or malformed manifest degrades to directory-derived defaults.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

static GO_MOD_FILE_NAME: &str = "go.mod";

/// A module discovered by walking upward from a test file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiscoveredModule {
    /// The module path declared in `go.mod`, or a directory-derived fallback.
    pub name: String,

    /// The directory containing `go.mod`, or the scan root if no manifest was
    /// found.
    pub root: Utf8PathBuf,
}

impl DiscoveredModule {
    /// Resolves the module owning `file_path` by searching parent directories
    /// for a `go.mod` manifest.
    ///
    /// If no manifest is found up to the filesystem root, the module falls
    /// back to `scan_root` with that directory's base name. Failure to read
    /// or parse a manifest falls back to its directory's base name.
    pub fn resolve(file_path: &Utf8Path, scan_root: &Utf8Path) -> Self {
        let start = file_path.parent().unwrap_or(scan_root);

        for dir in start.ancestors() {
            let manifest = dir.join(GO_MOD_FILE_NAME);
            if !manifest.is_file() {
                continue;
            }

            let name = match std::fs::read_to_string(&manifest) {
                Ok(contents) => parse_module_path(&contents),
                Err(error) => {
                    debug!("failed to read {manifest}: {error}");
                    None
                }
            };

            let name = name.unwrap_or_else(|| base_name(dir));
            return Self {
                name,
                root: dir.to_owned(),
            };
        }

        debug!("no go.mod above {file_path}, falling back to scan root");
        Self {
            name: base_name(scan_root),
            root: scan_root.to_owned(),
        }
    }
}

/// Extracts the declared module path from `go.mod` contents.
///
/// Returns `None` if no `module` directive is present, which callers treat as
/// a malformed manifest.
fn parse_module_path(contents: &str) -> Option<String> {
    for line in contents.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("module") {
            // Require whitespace after the keyword so that e.g. a "modulex"
            // identifier doesn't match.
            if !rest.starts_with(char::is_whitespace) {
                continue;
            }
            let path = rest.trim().trim_matches('"');
            if !path.is_empty() {
                return Some(path.to_owned());
            }
        }
    }
    None
}

fn base_name(dir: &Utf8Path) -> String {
    dir.file_name().unwrap_or(dir.as_str()).to_owned()
}
