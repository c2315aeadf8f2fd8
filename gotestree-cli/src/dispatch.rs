// Copyright (c) The gotestree Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{OutputContext, OutputOpts};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use etcetera::BaseStrategy;
use gotestree_core::{
    discovery,
    list::{OutputFormat, TestList},
    run_flags::{FlagStore, known_flags},
    scan::HeuristicScanner,
    store::ModelStore,
    transcript::RunOutput,
};
use std::io::Read;

/// An explorer for Go tests: discovery, run tracking and history.
#[derive(Debug, Parser)]
#[command(name = "gotestree", version, about)]
pub struct GotestreeApp {
    #[command(flatten)]
    output: OutputOpts,

    #[command(subcommand)]
    command: Command,
}

impl GotestreeApp {
    /// Executes the app.
    pub fn exec(self) -> Result<()> {
        let ctx = self.output.init();
        match self.command {
            Command::List(opts) => opts.exec(ctx),
            Command::Reconcile(opts) => opts.exec(ctx),
            Command::Flags(opts) => opts.exec(ctx),
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Discover tests under a directory and print the hierarchy
    List(ListOpts),

    /// Apply a recorded `go test` transcript to the discovered hierarchy
    Reconcile(ReconcileOpts),

    /// Inspect or change the persisted run-flag selection
    Flags(FlagsOpts),
}

#[derive(Debug, Args)]
struct ListOpts {
    /// Directory to scan [default: current directory]
    #[arg(long, value_name = "DIR")]
    scan_root: Option<Utf8PathBuf>,

    /// Output format
    #[arg(long, value_name = "FMT", default_value = "human")]
    message_format: OutputFormat,
}

impl ListOpts {
    fn exec(self, ctx: OutputContext) -> Result<()> {
        let root = scan_root_or_cwd(self.scan_root)?;
        if ctx.verbose {
            tracing::info!("scanning {root}");
        }
        let list = discover_list(&root)?;
        print_list(&ctx, &list, self.message_format)
    }
}

#[derive(Debug, Args)]
struct ReconcileOpts {
    /// Directory to scan [default: current directory]
    #[arg(long, value_name = "DIR")]
    scan_root: Option<Utf8PathBuf>,

    /// Package directory the transcript was produced for; relative paths are
    /// resolved against the scan root
    #[arg(long, value_name = "DIR")]
    package: Option<Utf8PathBuf>,

    /// Label to record in the run history
    #[arg(long, default_value = "go test")]
    label: String,

    /// Output format
    #[arg(long, value_name = "FMT", default_value = "human")]
    message_format: OutputFormat,

    /// Transcript file [default: stdin]
    transcript: Option<Utf8PathBuf>,
}

impl ReconcileOpts {
    fn exec(self, ctx: OutputContext) -> Result<()> {
        let root = scan_root_or_cwd(self.scan_root)?;
        let transcript = match &self.transcript {
            Some(path) => std::fs::read_to_string(path)
                .wrap_err_with(|| format!("failed to read transcript `{path}`"))?,
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .wrap_err("failed to read transcript from stdin")?;
                buf
            }
        };

        let package = self.package.map(|package| {
            if package.is_absolute() {
                package
            } else {
                root.join(package)
            }
        });

        let mut store = ModelStore::new();
        store.install_list(discover_list(&root)?);

        let output = RunOutput::parse(&transcript);
        if output.is_empty() {
            tracing::warn!("transcript matched no test output patterns");
        }
        store.apply_run_output(&output, package.as_deref());
        let results = store.collect_results();
        store.record_run(&self.label, results, chrono::Utc::now());

        match self.message_format {
            OutputFormat::Human => {
                print_list(&ctx, store.test_list(), OutputFormat::Human)?;
                if !store.history().is_empty() {
                    let mut out = String::new();
                    store
                        .history()
                        .write_human(&ctx.stdout_styles(), &mut out)?;
                    print!("{out}");
                }
            }
            OutputFormat::Json => {
                let doc = serde_json::json!({
                    "tests": store.test_list().to_summary(),
                    "history": store.history().to_summary(),
                });
                let json = serde_json::to_string_pretty(&doc)
                    .wrap_err("failed to serialize the run summary")?;
                println!("{json}");
            }
        }
        Ok(())
    }
}

#[derive(Debug, Args)]
struct FlagsOpts {
    /// Path of the flag store file [default: per-user config directory]
    #[arg(long, value_name = "PATH", env = "GOTESTREE_FLAG_STORE")]
    store_file: Option<Utf8PathBuf>,

    #[command(subcommand)]
    command: FlagsCommand,
}

#[derive(Debug, Subcommand)]
enum FlagsCommand {
    /// Show all known flags and their state
    Show,

    /// Switch a flag on
    Set {
        /// The flag identifier, e.g. `race`
        id: String,
    },

    /// Switch a flag off
    Unset {
        /// The flag identifier, e.g. `race`
        id: String,
    },

    /// Store the value used by a flag that takes one
    Value {
        /// The flag identifier, e.g. `timeout`
        id: String,
        /// The value, e.g. `60s`
        value: String,
    },

    /// Print the composed `go test` argument string
    Compose {
        /// Use this run filter instead of the stored one
        #[arg(long, value_name = "PATTERN")]
        filter: Option<String>,
    },
}

impl FlagsOpts {
    fn exec(self, ctx: OutputContext) -> Result<()> {
        let path = match self.store_file {
            Some(path) => path,
            None => default_store_path()?,
        };
        let mut store = FlagStore::load(&path)
            .wrap_err_with(|| format!("failed to load the flag store at `{path}`"))?;
        if ctx.verbose {
            tracing::info!("flag store: {}", store.path());
        }

        match self.command {
            FlagsCommand::Show => {
                for spec in known_flags() {
                    let marker = if store.is_active(spec.id) { "on " } else { "off" };
                    let value = match (spec.requires_value, store.value(spec.id)) {
                        (true, Some(value)) => format!(" = {value}"),
                        (true, None) => match spec.default_value {
                            Some(default) => format!(" = {default} (default)"),
                            None => " = (unset)".to_owned(),
                        },
                        (false, _) => String::new(),
                    };
                    println!(
                        "{marker}  {:10} {:8}{value:20}  {}",
                        spec.id, spec.token, spec.description,
                    );
                }
            }
            FlagsCommand::Set { id } => store.set_active(&id, true)?,
            FlagsCommand::Unset { id } => store.set_active(&id, false)?,
            FlagsCommand::Value { id, value } => store.set_value(&id, value)?,
            FlagsCommand::Compose { filter } => {
                println!("{}", store.compose_string(filter.as_deref()));
            }
        }
        Ok(())
    }
}

fn scan_root_or_cwd(scan_root: Option<Utf8PathBuf>) -> Result<Utf8PathBuf> {
    match scan_root {
        Some(root) => Ok(root),
        None => {
            let cwd = std::env::current_dir().wrap_err("failed to read the current directory")?;
            Utf8PathBuf::from_path_buf(cwd)
                .map_err(|cwd| color_eyre::eyre::eyre!("current directory {cwd:?} is not UTF-8"))
        }
    }
}

fn discover_list(root: &Utf8Path) -> Result<TestList> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start the async runtime")?;
    runtime
        .block_on(discovery::discover(root, &HeuristicScanner::new()))
        .wrap_err_with(|| format!("discovery failed under `{root}`"))
}

fn print_list(ctx: &OutputContext, list: &TestList, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Human => {
            let mut out = String::new();
            list.write_human(&ctx.stdout_styles(), &mut out)?;
            print!("{out}");
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&list.to_summary())
                .wrap_err("failed to serialize the test list")?;
            println!("{json}");
        }
    }
    Ok(())
}

fn default_store_path() -> Result<Utf8PathBuf> {
    let strategy =
        etcetera::choose_base_strategy().wrap_err("failed to locate the home directory")?;
    let config_dir = Utf8PathBuf::from_path_buf(strategy.config_dir())
        .map_err(|dir| color_eyre::eyre::eyre!("config directory {dir:?} is not UTF-8"))?;
    Ok(config_dir.join("gotestree/flags.json"))
}
