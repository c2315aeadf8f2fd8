// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::Parser;
use color_eyre::Result;
use gotestree_cli::GotestreeApp;

fn main() -> Result<()> {
    color_eyre::install()?;
    GotestreeApp::parse().exec()
}
