//! Command-line arguments.

use crate::config::Config;
use crate::error::AppError;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// REX staging engine: fork, save and publish content items.
#[derive(Debug, Parser)]
#[command(name = "rex", version, about)]
pub struct Cli {
    /// Database path [default: from config, else rex.db]
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Storage backend: file or redb [default: from config, else file]
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// JSON configuration file (users, roles, server settings)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an empty database
    Init {
        /// Overwrite an existing database
        #[arg(long)]
        force: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Listen address [default: from config, else 127.0.0.1:8080]
        #[arg(long)]
        bind: Option<String>,
    },

    /// Summarize the database
    Status {
        #[arg(long)]
        json: bool,
    },

    /// Fork an item into a new staging item
    Fork {
        /// Login of the acting user
        #[arg(long, short = 'u')]
        user: String,
        source_id: u64,
        #[arg(long, default_value = "draft")]
        status: String,
    },

    /// Save an item from a JSON `data` file
    Save {
        #[arg(long, short = 'u')]
        user: String,
        /// Item to update; omit to create
        #[arg(long)]
        id: Option<u64>,
        #[arg(long = "type", default_value = "post")]
        post_type: String,
        /// File holding the `data` object (post_title, meta, ...)
        data: PathBuf,
    },

    /// Publish a staging item
    Publish {
        #[arg(long, short = 'u')]
        user: String,
        staging_id: u64,
    },

    /// Print one item as JSON
    Show {
        #[arg(long, short = 'u')]
        user: String,
        id: u64,
    },

    /// Export the database
    Export {
        #[arg(long, short = 'o')]
        output: PathBuf,
        /// canonical (binary snapshot) or json
        #[arg(long, default_value = "canonical")]
        format: String,
    },

    /// Import an export into an empty database
    Import {
        #[arg(long, short = 'i')]
        input: PathBuf,
    },
}

impl Cli {
    /// Load the configuration and apply the global flag overrides.
    pub fn settings(&self) -> Result<Config, AppError> {
        let mut config = Config::load_or_default(self.config.as_deref())?;
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if let Some(backend) = &self.backend {
            config.backend = backend.clone();
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_override_defaults() -> Result<(), AppError> {
        let cli = Cli::try_parse_from([
            "rex", "status", "--db", "other.redb", "--backend", "redb",
        ])
        .map_err(|e| AppError::InvalidArgument(e.to_string()))?;
        let config = cli.settings()?;
        assert_eq!(config.db_path, PathBuf::from("other.redb"));
        assert_eq!(config.backend, "redb");
        Ok(())
    }

    #[test]
    fn fork_defaults_to_draft() -> Result<(), AppError> {
        let cli = Cli::try_parse_from(["rex", "fork", "--user", "ed", "10"])
            .map_err(|e| AppError::InvalidArgument(e.to_string()))?;
        match cli.command {
            Command::Fork {
                user,
                source_id,
                status,
            } => {
                assert_eq!(user, "ed");
                assert_eq!(source_id, 10);
                assert_eq!(status, "draft");
            }
            other => return Err(AppError::Internal(format!("parsed {:?}", other))),
        }
        Ok(())
    }
}
