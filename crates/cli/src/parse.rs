//! ArgMatches → CliAction conversion.

use clap::ArgMatches;
use std::path::PathBuf;

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliAction {
    /// Build the workflow described in a file.
    CreateFromFile(PathBuf),
    /// Serve the web form, building each submitted workflow.
    CreateViaWeb,
    /// Run the workflow described in a file.
    Run(PathBuf),
    /// Print what an image says about itself.
    Inspect(PathBuf),
}

/// Options shared by every command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub verbose: bool,
}

/// Read the global options.
pub fn global_options(matches: &ArgMatches) -> GlobalOptions {
    GlobalOptions {
        config: matches.get_one::<String>("config").map(PathBuf::from),
        verbose: matches.get_flag("verbose"),
    }
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "workflow" => parse_workflow(sub_matches),
        "inspect" => {
            let image = sub_matches
                .get_one::<String>("image")
                .ok_or("No image given")?;
            Ok(CliAction::Inspect(PathBuf::from(image)))
        }
        other => Err(format!("Unknown command: {}", other)),
    }
}

fn parse_workflow(matches: &ArgMatches) -> Result<CliAction, String> {
    let create = matches.get_flag("create");
    let run = matches.get_flag("run");
    let file = matches.get_one::<String>("file").map(PathBuf::from);

    match (create, run, file) {
        (true, true, _) => Err("Cannot create a workflow and run it at the same time".to_string()),
        (false, false, _) => Err("Must use at least one flag: --create or --run".to_string()),
        (true, false, Some(file)) => Ok(CliAction::CreateFromFile(file)),
        (true, false, None) => Ok(CliAction::CreateViaWeb),
        (false, true, Some(file)) => Ok(CliAction::Run(file)),
        (false, true, None) => Err("--run requires a workflow description FILE".to_string()),
    }
}
