//! TRIC CLI: build, run and inspect containerised workflows.
//!
//! - `tric workflow --create FILE` builds the images described in FILE
//! - `tric workflow --create` serves the web form instead
//! - `tric workflow --run FILE` runs a built workflow and records provenance
//! - `tric inspect IMAGE` prints what an image says about itself

mod commands;
mod format;
mod parse;
mod web;

use std::path::Path;
use std::process;

use anyhow::Context;
use tracing_subscriber::EnvFilter;
use tric::Tric;

use commands::build_cli;
use format::{format_built, format_metadata, format_report};
use parse::{global_options, matches_to_action, CliAction, GlobalOptions};
use web::FormServer;

fn main() {
    let matches = build_cli().get_matches();
    let options = global_options(&matches);
    init_tracing(options.verbose);

    let action = match matches_to_action(&matches) {
        Ok(action) => action,
        Err(e) => {
            eprintln!("(error) {}", e);
            process::exit(2);
        }
    };

    if let Err(e) = execute(action, &options) {
        eprintln!("(error) {}", error_chain(&e));
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn execute(action: CliAction, options: &GlobalOptions) -> anyhow::Result<()> {
    let tric = Tric::discover(options.config.as_deref()).context("failed to load settings")?;

    match action {
        CliAction::CreateFromFile(path) => {
            let (workflow, built) = tric
                .create_from_file(&path)
                .with_context(|| format!("failed to create workflow from {}", path.display()))?;
            print!("{}", format_built(&built));
            println!("Workflow {:?} created", workflow.name);
        }
        CliAction::CreateViaWeb => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("failed to start async runtime")?;
            runtime.block_on(FormServer::new(tric, Path::new(".")).serve())?;
            println!("Server closed");
        }
        CliAction::Run(path) => {
            let (workflow, record) = tric
                .run_from_file(&path)
                .with_context(|| format!("failed to run workflow from {}", path.display()))?;
            println!("Workflow {:?} finished", workflow.name);
            print!("{}", format_metadata(&record));
        }
        CliAction::Inspect(image) => {
            let report = tric
                .inspect(&image)
                .with_context(|| format!("failed to inspect {}", image.display()))?;
            print!("{}", format_report(&report));
        }
    }
    Ok(())
}

// Causes already quoted by the message above them are skipped.
fn error_chain(e: &anyhow::Error) -> String {
    let mut message = e.to_string();
    for cause in e.chain().skip(1) {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
    }
    message
}
