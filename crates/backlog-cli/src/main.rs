#![forbid(unsafe_code)]

mod cmd;
mod output;

use clap::{Parser, Subcommand};
use output::{OutputMode, cli_error, render_error, resolve_output_mode};
use std::env;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "bl: ordered story backlogs with gap-free positions",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Output format: pretty, text, or json.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn output_mode(&self) -> OutputMode {
        resolve_output_mode(self.format, self.json)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Setup",
        about = "Initialize a backlog in the current directory",
        after_help = "EXAMPLES:\n    # Create .backlog/ with config and store\n    bl init\n\n    # Reset config.toml to the template\n    bl init --force"
    )]
    Init(cmd::init::InitArgs),

    #[command(
        next_help_heading = "Setup",
        about = "Manage projects",
        after_help = "EXAMPLES:\n    # Create a project with the backlogs module\n    bl project add Platform\n\n    # Create a subproject without it\n    bl project add Ops --parent 1 --no-backlogs\n\n    # Turn the backlogs module off\n    bl project disable-backlogs 2"
    )]
    Project {
        #[command(subcommand)]
        command: cmd::project::ProjectCommand,
    },

    #[command(
        next_help_heading = "Setup",
        about = "Manage sprints",
        after_help = "EXAMPLES:\n    # Create a sprint shared with subprojects\n    bl sprint add \"Sprint 1\" --project 1 --sharing descendants\n\n    # Sprints a project can plan into\n    bl sprint list --project 2"
    )]
    Sprint {
        #[command(subcommand)]
        command: cmd::sprint::SprintCommand,
    },

    #[command(
        next_help_heading = "Items",
        about = "Create an item",
        after_help = "EXAMPLES:\n    # Story at the bottom of sprint 3\n    bl create --project 1 --type 1 --sprint 3 --subject \"Login form\"\n\n    # Story right after item 12\n    bl create --project 1 --type 1 --subject \"Logout\" --after 12"
    )]
    Create(cmd::create::CreateArgs),

    #[command(
        next_help_heading = "Items",
        about = "Change type, sprint, or subject of an item",
        after_help = "EXAMPLES:\n    # Plan into sprint 4\n    bl update 12 --sprint 4\n\n    # Back to the product backlog\n    bl update 12 --no-sprint"
    )]
    Update(cmd::update::UpdateArgs),

    #[command(
        next_help_heading = "Items",
        about = "Move an item to another project",
        after_help = "EXAMPLES:\n    # Move item 12 to project 2\n    bl move-project 12 --to 2"
    )]
    MoveProject(cmd::move_project::MoveProjectArgs),

    #[command(
        next_help_heading = "Items",
        about = "Delete an item",
        after_help = "EXAMPLES:\n    bl delete 12"
    )]
    Delete(cmd::delete::DeleteArgs),

    #[command(
        next_help_heading = "Ordering",
        about = "Apply a drag-and-drop result",
        long_about = "Place the dropped item directly after its predecessor in the submitted order. \
                      With --moveto the item first moves to that scope of the project.",
        after_help = "EXAMPLES:\n    # Drop item 3 between 4 and 5\n    bl reorder --project 1 --dropped 3 --order 1,2,4,3,5\n\n    # Drag item 7 into sprint 2, below item 9\n    bl reorder --project 1 --dropped 7 --order 9,7 --moveto 2"
    )]
    Reorder(cmd::reorder::ReorderArgs),

    #[command(
        next_help_heading = "Ordering",
        about = "List ordered stories",
        after_help = "EXAMPLES:\n    # Product backlog and every visible sprint\n    bl list --project 1\n\n    # One sprint, as JSON\n    bl list --project 1 --sprint 3 --json"
    )]
    List(cmd::list::ListArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Re-sequence every scope of a project",
        after_help = "EXAMPLES:\n    bl rebuild-positions --project 1"
    )]
    RebuildPositions(cmd::rebuild::RebuildArgs),

    #[command(
        next_help_heading = "Maintenance",
        about = "Report position problems without changing anything",
        after_help = "EXAMPLES:\n    bl check --project 1"
    )]
    Check(cmd::check::CheckArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("BACKLOG_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "backlog_core=debug,backlog_cli=debug,info"
        } else {
            "backlog_core=warn,warn"
        })
    });

    let format = env::var("BACKLOG_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn run(cli: &Cli, output: OutputMode) -> anyhow::Result<()> {
    let project_root = env::current_dir()?;
    debug!(root = %project_root.display(), ?output, "running command");

    match &cli.command {
        Commands::Init(args) => cmd::init::run_init(args, output, &project_root),
        Commands::Project { command } => cmd::project::run_project(command, output, &project_root),
        Commands::Sprint { command } => cmd::sprint::run_sprint(command, output, &project_root),
        Commands::Create(args) => cmd::create::run_create(args, output, &project_root),
        Commands::Update(args) => cmd::update::run_update(args, output, &project_root),
        Commands::MoveProject(args) => {
            cmd::move_project::run_move_project(args, output, &project_root)
        }
        Commands::Delete(args) => cmd::delete::run_delete(args, output, &project_root),
        Commands::Reorder(args) => cmd::reorder::run_reorder(args, output, &project_root),
        Commands::List(args) => cmd::list::run_list(args, output, &project_root),
        Commands::RebuildPositions(args) => cmd::rebuild::run_rebuild(args, output, &project_root),
        Commands::Check(args) => cmd::check::run_check(args, output, &project_root),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let output = cli.output_mode();

    match run(&cli, output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if let Err(render_err) = render_error(output, &cli_error(&err)) {
                eprintln!("error: {err:#} ({render_err})");
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_flag_sets_output_mode() {
        let cli = Cli::parse_from(["bl", "--json", "check", "--project", "1"]);
        assert!(cli.json);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn json_flag_after_subcommand() {
        let cli = Cli::parse_from(["bl", "check", "--project", "1", "--json"]);
        assert!(cli.output_mode().is_json());
    }

    #[test]
    fn format_flag_parses() {
        let cli = Cli::parse_from(["bl", "--format", "text", "project", "list"]);
        assert_eq!(cli.format, Some(OutputMode::Text));
    }

    #[test]
    fn reorder_subcommand_parses() {
        let cli = Cli::parse_from([
            "bl", "reorder", "--project", "1", "--dropped", "3", "--order", "1,2,4,3,5",
        ]);
        assert!(matches!(cli.command, Commands::Reorder(_)));
    }

    #[test]
    fn non_numeric_project_is_a_usage_error() {
        assert!(Cli::try_parse_from(["bl", "list", "--project", "abc"]).is_err());
        assert!(Cli::try_parse_from(["bl", "list", "--project", "0"]).is_err());
    }

    #[test]
    fn unknown_sharing_is_a_usage_error() {
        assert!(
            Cli::try_parse_from(["bl", "sprint", "add", "S", "--project", "1", "--sharing", "all"])
                .is_err()
        );
    }

    #[test]
    fn all_subcommands_listed() {
        let subcommands = [
            vec!["bl", "init"],
            vec!["bl", "project", "add", "Platform"],
            vec!["bl", "project", "add", "Ops", "--parent", "1", "--no-backlogs"],
            vec!["bl", "project", "list"],
            vec!["bl", "project", "enable-backlogs", "1"],
            vec!["bl", "project", "disable-backlogs", "1"],
            vec!["bl", "sprint", "add", "Sprint 1", "--project", "1"],
            vec!["bl", "sprint", "list", "--project", "1"],
            vec!["bl", "create", "--project", "1", "--type", "1", "--subject", "s"],
            vec!["bl", "update", "4", "--type", "2"],
            vec!["bl", "move-project", "4", "--to", "2"],
            vec!["bl", "delete", "4"],
            vec!["bl", "reorder", "--project", "1", "--dropped", "4", "--order", "4"],
            vec!["bl", "list", "--project", "1"],
            vec!["bl", "rebuild-positions", "--project", "1"],
            vec!["bl", "check", "--project", "1"],
        ];
        for args in &subcommands {
            let result = Cli::try_parse_from(args.iter());
            assert!(
                result.is_ok(),
                "Failed to parse: {:?}, error: {:?}",
                args,
                result.err()
            );
        }
    }
}
