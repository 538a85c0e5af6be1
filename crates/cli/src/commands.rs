//! Command tree definition.

use clap::{Arg, ArgAction, Command};

/// Build the `tric` command.
pub fn build_cli() -> Command {
    Command::new("tric")
        .about("Traceable, reproducible workflows built from individually containerised images")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_name("FILE")
                .help("Settings file (default: ./tric.toml when present)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level unless RUST_LOG is set"),
        )
        .subcommand(workflow_command())
        .subcommand(inspect_command())
}

fn workflow_command() -> Command {
    Command::new("workflow")
        .about("Create or run a workflow")
        .arg(
            Arg::new("create")
                .short('c')
                .long("create")
                .action(ArgAction::SetTrue)
                .help("Build the workflow's images; without FILE, serve the web form"),
        )
        .arg(
            Arg::new("run")
                .short('r')
                .long("run")
                .action(ArgAction::SetTrue)
                .help("Run a built workflow and record provenance in its output image"),
        )
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Workflow description (JSON)"),
        )
}

fn inspect_command() -> Command {
    Command::new("inspect")
        .about("Show an image's identity, objects and embedded metadata")
        .arg(
            Arg::new("image")
                .value_name("IMAGE")
                .required(true)
                .help("Image file"),
        )
}
