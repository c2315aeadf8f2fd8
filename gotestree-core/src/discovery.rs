// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Filesystem discovery of Go test files.
//!
//! Discovery walks a scan root for `*_test.go` files, scans each one, and
//! builds a complete [`TestList`] in one shot. Individual unreadable files
//! are logged and skipped; partial results are preferred over aborting. The
//! produced list is handed to
//! [`ModelStore::install_list`](crate::store::ModelStore::install_list) as
//! one atomic replacement; no partially built tree is ever observable.

use crate::{
    errors::DiscoverError,
    go_mod::DiscoveredModule,
    list::{ScannedFile, TestList},
    scan::FileScanner,
};
use camino::{Utf8Path, Utf8PathBuf};
use futures::{StreamExt, stream};
use std::collections::HashMap;
use tokio::fs;
use tracing::{debug, warn};

/// How many file reads are kept in flight at once.
const READ_CONCURRENCY: usize = 16;

/// Directories that never contain reachable tests.
fn skip_dir(name: &str) -> bool {
    name == "vendor" || name == "testdata" || name.starts_with('.') || name.starts_with('_')
}

fn is_test_file(name: &str) -> bool {
    name.ends_with("_test.go")
}

/// Discovers every test under `root` and builds the hierarchy.
///
/// Returns an error only if the root itself cannot be read; everything below
/// it degrades gracefully.
pub async fn discover(
    root: &Utf8Path,
    scanner: &dyn FileScanner,
) -> Result<TestList, DiscoverError> {
    let metadata = fs::metadata(root)
        .await
        .map_err(|error| DiscoverError::RootRead {
            root: root.to_owned(),
            error,
        })?;
    if !metadata.is_dir() {
        return Err(DiscoverError::RootNotADirectory {
            root: root.to_owned(),
        });
    }

    let test_files = collect_test_files(root).await;
    debug!("found {} test files under {root}", test_files.len());

    let reads: Vec<(Utf8PathBuf, Result<String, std::io::Error>)> = stream::iter(test_files)
        .map(|path| async move {
            let contents = fs::read_to_string(&path).await;
            (path, contents)
        })
        .buffered(READ_CONCURRENCY)
        .collect()
        .await;

    let mut module_cache: HashMap<Utf8PathBuf, DiscoveredModule> = HashMap::new();
    let mut modules: Vec<DiscoveredModule> = Vec::new();
    let mut files = Vec::new();

    for (path, contents) in reads {
        let contents = match contents {
            Ok(contents) => contents,
            Err(error) => {
                warn!("failed to read {path}: {error}, skipping");
                continue;
            }
        };
        let Some(dir) = path.parent() else {
            warn!("file {path} has no parent directory, skipping");
            continue;
        };

        let module = module_cache
            .entry(dir.to_owned())
            .or_insert_with(|| DiscoveredModule::resolve(&path, root))
            .clone();
        if !modules.contains(&module) {
            modules.push(module);
        }

        files.push(ScannedFile {
            path,
            result: scanner.scan(&contents),
        });
    }

    Ok(TestList::build(modules, files))
}

/// Walks the directory tree below `root`, collecting `*_test.go` paths.
///
/// Unreadable directories and non-UTF-8 paths are skipped with a warning.
async fn collect_test_files(root: &Utf8Path) -> Vec<Utf8PathBuf> {
    let mut pending = vec![root.to_owned()];
    let mut found = Vec::new();

    while let Some(dir) = pending.pop() {
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(error) => {
                warn!("failed to read directory {dir}: {error}, skipping");
                continue;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(error) => {
                    warn!("failed to read an entry of {dir}: {error}, skipping the rest");
                    break;
                }
            };
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                warn!("skipping non-UTF-8 path in {dir}");
                continue;
            };
            let Some(name) = path.file_name() else {
                continue;
            };

            match entry.file_type().await {
                Ok(file_type) if file_type.is_dir() => {
                    if !skip_dir(name) {
                        pending.push(path);
                    }
                }
                Ok(file_type) if file_type.is_file() => {
                    if is_test_file(name) {
                        found.push(path);
                    }
                }
                Ok(_) => {}
                Err(error) => {
                    warn!("failed to stat {path}: {error}, skipping");
                }
            }
        }
    }

    found.sort();
    found
}
