//! BridgeDB CLI Module
//! Command-line interface for BridgeDB operations

pub mod formatter;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "bridgedb")]
#[command(author = "BridgeDB Team")]
#[command(version)]
#[command(about = "Resolve SQL-to-key-value relationships", long_about = None)]
pub struct Cli {
    /// Project directory (defaults to current directory)
    #[arg(short, long, global = true)]
    pub project: Option<PathBuf>,

    /// Output format (json for scripting)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a project in the project directory
    Init {
        /// Project name
        #[arg(short, long)]
        name: String,
    },

    /// Add or replace a user in the SQL store
    AddUser {
        /// User id
        #[arg(long)]
        id: i64,

        /// Display name
        #[arg(long)]
        name: String,

        /// Id of the user's special action
        #[arg(long)]
        special_action: Option<String>,
    },

    /// Add an action owned by a user to the key-value store
    AddAction {
        /// Owning user id
        #[arg(long)]
        owner: String,

        /// Action id
        #[arg(long)]
        id: String,

        /// Action description
        description: String,
    },

    /// List actions, optionally scoped to one owner
    Actions {
        /// Owning user id
        #[arg(long)]
        owner: Option<String>,
    },

    /// Load a single action
    Action {
        /// Action id
        id: String,

        /// Owning user id
        #[arg(long)]
        owner: Option<String>,
    },

    /// Resolve a relation from a user into the key-value store
    Bridge {
        /// Parent user id
        #[arg(long)]
        user: String,

        /// Relation name on the user
        #[arg(long)]
        relation: String,

        /// Load one member instead of the whole relation
        #[arg(long)]
        lookup_id: Option<String>,
    },

    /// Show project status
    Status,
}

impl Cli {
    pub fn get_project_dir(&self) -> PathBuf {
        self.project
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bridge_command() {
        let cli = Cli::parse_from([
            "bridgedb", "--format", "json", "bridge", "--user", "1", "--relation", "redisActions",
        ]);
        assert_eq!(cli.format, OutputFormat::Json);
        match cli.command {
            Commands::Bridge { user, relation, lookup_id } => {
                assert_eq!(user, "1");
                assert_eq!(relation, "redisActions");
                assert!(lookup_id.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_add_action() {
        let cli = Cli::parse_from([
            "bridgedb", "-p", "/tmp/demo", "add-action", "--owner", "A1", "--id", "r1", "buy milk",
        ]);
        assert_eq!(cli.get_project_dir(), PathBuf::from("/tmp/demo"));
        assert!(matches!(cli.command, Commands::AddAction { ref description, .. } if description == "buy milk"));
    }
}
