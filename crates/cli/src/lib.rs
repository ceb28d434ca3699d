mod index;
mod inspect;
mod search;

use clap::{Parser, Subcommand};
use cmtscope_core::logging::{LogSettings, init_logging};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cmtscope",
    version,
    about = "Dependency index and structural search for Java code migration",
    long_about = "cmtscope loads Eclipse-style workspaces and JAR archives into an item graph of \
                  projects, packages, classes, methods and fields, persists it as a snapshot, and \
                  runs XML search queries over the Java sources against it."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Load a workspace and write the next snapshot
    #[command(long_about = "Loads every project and archive below the workspace root and writes \
                            api-v<N>.zip, where N is one past the highest version in the output \
                            directory.")]
    Index {
        /// Workspace root directory
        #[arg(value_name = "WORKSPACE")]
        path: PathBuf,

        /// Directory that receives the snapshot (defaults to the workspace root)
        #[arg(long, value_name = "DIR")]
        out: Option<PathBuf>,

        /// JSON load configuration
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Snapshot to layer the new index on
        #[arg(long, value_name = "SNAPSHOT")]
        base: Option<PathBuf>,

        /// Scheduler worker threads
        #[arg(long)]
        workers: Option<usize>,

        /// Keep unreferenced third-party items
        #[arg(long)]
        no_prune: bool,
    },
    /// Run a search query over the workspace sources
    Search {
        /// Workspace root directory
        #[arg(value_name = "WORKSPACE")]
        path: PathBuf,

        /// XML query file
        #[arg(long, value_name = "FILE")]
        query: PathBuf,

        /// Read the index from a snapshot instead of loading the workspace
        #[arg(long, value_name = "FILE")]
        snapshot: Option<PathBuf>,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summarize a snapshot or show one item's relationships
    Inspect {
        #[arg(value_name = "SNAPSHOT")]
        snapshot: PathBuf,

        /// Qualified name of the item to show
        #[arg(long, value_name = "NAME")]
        fqn: Option<String>,
    },
}

impl Commands {
    /// Daily log file prefix for this command.
    pub fn log_component(&self) -> &'static str {
        match self {
            Commands::Index { .. } => "index",
            Commands::Search { .. } => "search",
            Commands::Inspect { .. } => "inspect",
        }
    }
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = LogSettings::from_env();
    let _guard = init_logging(cli.command.log_component(), &settings, true);

    match cli.command {
        Commands::Index {
            path,
            out,
            config,
            base,
            workers,
            no_prune,
        } => index::run(index::IndexArgs {
            path,
            out,
            config,
            base,
            workers,
            no_prune,
        }),
        Commands::Search {
            path,
            query,
            snapshot,
            json,
        } => search::run(&path, &query, snapshot.as_deref(), json),
        Commands::Inspect { snapshot, fqn } => inspect::run(&snapshot, fqn.as_deref()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_flags_parse() {
        let cli = Cli::try_parse_from([
            "cmtscope",
            "index",
            "ws",
            "--out",
            "snapshots",
            "--workers",
            "4",
            "--no-prune",
        ])
        .expect("parse");
        let Commands::Index {
            path,
            out,
            workers,
            no_prune,
            base,
            ..
        } = cli.command
        else {
            panic!("expected index");
        };
        assert_eq!(path, PathBuf::from("ws"));
        assert_eq!(out, Some(PathBuf::from("snapshots")));
        assert_eq!(workers, Some(4));
        assert!(no_prune);
        assert!(base.is_none());
    }

    #[test]
    fn search_requires_a_query() {
        assert!(Cli::try_parse_from(["cmtscope", "search", "ws"]).is_err());
        assert!(Cli::try_parse_from(["cmtscope", "search", "ws", "--query", "q.xml", "--json"]).is_ok());
    }

    #[test]
    fn each_command_logs_to_its_own_file() {
        let component = |args: &[&str]| Cli::try_parse_from(args).expect("parse").command.log_component();
        assert_eq!(component(&["cmtscope", "index", "ws"]), "index");
        assert_eq!(component(&["cmtscope", "search", "ws", "--query", "q.xml"]), "search");
        assert_eq!(component(&["cmtscope", "inspect", "api-v1.zip"]), "inspect");
    }
}
