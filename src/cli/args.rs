//! CLI argument definitions using clap
//!
//! Commands:
//! - lifeboat serve
//! - lifeboat backup
//! - lifeboat restore <backup-id> [--yes]
//! - lifeboat history [--limit]
//! - lifeboat verify <backup-id>
//! - lifeboat cleanup
//!
//! Every command accepts `--config <path>`; without it the process
//! runs on defaults plus environment overrides.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// lifeboat - backup and restore orchestration for a managed database
#[derive(Parser, Debug)]
#[command(name = "lifeboat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP API and the unattended backup scheduler
    Serve {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Run one backup now and print the resulting record
    Backup {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Restore a backup over the live database
    ///
    /// Destructive: current data is replaced by the artifact contents.
    /// A safety snapshot is taken first, but a failed restore is not
    /// rolled back automatically.
    Restore {
        /// Backup id to restore
        backup_id: String,

        /// Skip the typed confirmation prompt
        #[arg(long)]
        yes: bool,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List recorded backups, newest first
    History {
        /// Number of records to show
        #[arg(long, short = 'n', default_value = "20")]
        limit: usize,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Re-verify a backup artifact against its recorded checksum
    Verify {
        /// Backup id to verify
        backup_id: String,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Delete backups older than the retention window now
    Cleanup {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backup() {
        let cli = Cli::try_parse_from(["lifeboat", "backup"]).unwrap();
        assert!(matches!(cli.command, Command::Backup { config: None }));
    }

    #[test]
    fn test_parse_restore_requires_backup_id() {
        assert!(Cli::try_parse_from(["lifeboat", "restore"]).is_err());
    }

    #[test]
    fn test_parse_restore_with_yes() {
        let cli =
            Cli::try_parse_from(["lifeboat", "restore", "backup_1_aaaaaa", "--yes"]).unwrap();
        match cli.command {
            Command::Restore {
                backup_id,
                yes,
                config,
            } => {
                assert_eq!(backup_id, "backup_1_aaaaaa");
                assert!(yes);
                assert!(config.is_none());
            }
            other => panic!("expected restore, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_history_limit() {
        let cli = Cli::try_parse_from(["lifeboat", "history", "-n", "5"]).unwrap();
        match cli.command {
            Command::History { limit, .. } => assert_eq!(limit, 5),
            other => panic!("expected history, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_config_path() {
        let cli =
            Cli::try_parse_from(["lifeboat", "serve", "--config", "/etc/lifeboat.toml"]).unwrap();
        match cli.command {
            Command::Serve { config } => {
                assert_eq!(config.unwrap(), PathBuf::from("/etc/lifeboat.toml"));
            }
            other => panic!("expected serve, got {:?}", other),
        }
    }
}
