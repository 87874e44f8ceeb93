//! Command-line argument parsing for Overseer
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::tools::ToolCategory;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Overseer - run configured malware-analysis tools against a sample
#[derive(Parser, Debug)]
#[command(name = "overseer")]
#[command(version)]
#[command(about = "Run configured static and dynamic analysis tools", long_about = None)]
pub struct Args {
    /// Configuration file path (TOML, or JSON by extension)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -v (info), -vv (debug), -vvv (trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (results only, errors logged)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run analysis tools (all tools by default)
    Run {
        /// Run a single tool by name
        #[arg(short, long, conflicts_with_all = ["static_only", "dynamic_only"])]
        tool: Option<String>,

        /// Run all static analysis tools
        #[arg(long = "static", conflicts_with = "dynamic_only")]
        static_only: bool,

        /// Run all dynamic analysis tools
        #[arg(long = "dynamic")]
        dynamic_only: bool,

        /// Override worker-pool width
        #[arg(long)]
        parallel: Option<usize>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// List configured tools
    List {
        /// Only list one category
        #[arg(long)]
        category: Option<ToolCategory>,
    },
}

/// Which tools a `run` targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSelection {
    One(String),
    Category(ToolCategory),
    All,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
    Trace,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                2 => Verbosity::VeryVerbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

impl Commands {
    /// Selection for a `run` command; `None` for other commands
    pub fn selection(&self) -> Option<RunSelection> {
        match self {
            Commands::Run {
                tool,
                static_only,
                dynamic_only,
                ..
            } => Some(match (tool, static_only, dynamic_only) {
                (Some(name), _, _) => RunSelection::One(name.clone()),
                (None, true, _) => RunSelection::Category(ToolCategory::Static),
                (None, false, true) => RunSelection::Category(ToolCategory::Dynamic),
                (None, false, false) => RunSelection::All,
            }),
            Commands::List { .. } => None,
        }
    }
}

impl Verbosity {
    /// Default `tracing` filter for this level
    pub fn log_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "info",
            Verbosity::VeryVerbose => "debug",
            Verbosity::Trace => "trace",
        }
    }

    /// Check if should show the run summary
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_quiet() {
        let args = parse(&["overseer", "-q", "list"]);
        assert_eq!(args.verbosity(), Verbosity::Quiet);
        assert_eq!(args.verbosity().log_filter(), "error");
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["overseer", "list"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["overseer", "-v", "list"]).verbosity(), Verbosity::Verbose);
        assert_eq!(
            parse(&["overseer", "list", "-vv"]).verbosity(),
            Verbosity::VeryVerbose
        );
    }

    #[test]
    fn test_run_selection_default_all() {
        let args = parse(&["overseer", "run", "-c", "tools.toml"]);
        assert_eq!(args.command.selection(), Some(RunSelection::All));
        assert_eq!(args.config, Some(PathBuf::from("tools.toml")));
    }

    #[test]
    fn test_run_selection_single_tool() {
        let args = parse(&["overseer", "run", "--tool", "Capa"]);
        assert_eq!(
            args.command.selection(),
            Some(RunSelection::One("Capa".to_string()))
        );
    }

    #[test]
    fn test_run_selection_categories() {
        let args = parse(&["overseer", "run", "--static"]);
        assert_eq!(
            args.command.selection(),
            Some(RunSelection::Category(ToolCategory::Static))
        );

        let args = parse(&["overseer", "run", "--dynamic"]);
        assert_eq!(
            args.command.selection(),
            Some(RunSelection::Category(ToolCategory::Dynamic))
        );
    }

    #[test]
    fn test_conflicting_selection_rejected() {
        assert!(Args::try_parse_from(["overseer", "run", "--static", "--dynamic"]).is_err());
        assert!(Args::try_parse_from(["overseer", "run", "-t", "Capa", "--static"]).is_err());
    }

    #[test]
    fn test_list_category_filter() {
        let args = parse(&["overseer", "list", "--category", "dynamic"]);
        assert!(args.command.selection().is_none());
        match args.command {
            Commands::List { category } => assert_eq!(category, Some(ToolCategory::Dynamic)),
            _ => panic!("expected list"),
        }
    }
}
