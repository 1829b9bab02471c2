use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mactide")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative macOS workstation configuration", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make this machine match the configuration
    Apply(ApplyArgs),

    /// Preview what apply would change
    Diff(DiffArgs),

    /// Search the Mac App Store for app ids
    Search {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Show the persisted settings record
    Record {
        /// Print the raw record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Configuration file (defaults to config.toml in the config directory)
    pub config: Option<PathBuf>,

    /// Show the diff without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Also remove packages, casks and apps that are not declared
    #[arg(long)]
    pub strict: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    /// Configuration file (defaults to config.toml in the config directory)
    pub config: Option<PathBuf>,

    /// Include removals of undeclared packages, casks and apps
    #[arg(long)]
    pub strict: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::parse_from(["mactide", "-vv", "apply", "machine.toml", "--strict", "-y"]);
        assert_eq!(cli.verbose, 2);
        let Command::Apply(args) = cli.command else {
            panic!("expected apply");
        };
        assert_eq!(args.config, Some(PathBuf::from("machine.toml")));
        assert!(args.strict);
        assert!(args.yes);
        assert!(!args.dry_run);
    }

    #[test]
    fn test_parse_search_joins_terms() {
        let cli = Cli::parse_from(["mactide", "search", "final", "cut"]);
        let Command::Search { query } = cli.command else {
            panic!("expected search");
        };
        assert_eq!(query, vec!["final", "cut"]);
    }
}
