//! Command-line interface for sitegate.
//!
//! This module provides the CLI structure for the `sitegate` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ComplianceCommand, ConfigCommand, DeliveryCommand, NoticeCommand, NoticeTypeArg,
    NotificationCommand, OutputFormat, PriorityArg, ProjectCommand, ProjectStatusArg,
    QualificationCommand, RamsCommand, RiskArg, RoleArg, StatusCommand, UserCommand,
};

/// sitegate - Site workforce records with RAMS signing and compliance gating
///
/// Keeps users, projects, RAMS documents, signatures, deliveries, notices and
/// qualifications for a construction site in one local database.
#[derive(Debug, Parser)]
#[command(name = "sitegate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Email of the user to act as
    #[arg(long = "as", global = true, value_name = "EMAIL")]
    pub acting_as: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show database statistics
    Status(StatusCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Manage projects, plots and work
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Issue, assign, read and sign RAMS documents
    #[command(subcommand)]
    Rams(RamsCommand),

    /// Check RAMS compliance
    #[command(subcommand)]
    Compliance(ComplianceCommand),

    /// Request and review deliveries
    #[command(subcommand)]
    Delivery(DeliveryCommand),

    /// Post and read site notices
    #[command(subcommand)]
    Notice(NoticeCommand),

    /// Read your notifications
    #[command(subcommand)]
    Notification(NotificationCommand),

    /// Track qualifications and expiry
    #[command(subcommand)]
    Qualification(QualificationCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        crate::logging::Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn status_cli(verbose: u8, quiet: bool) -> Cli {
        Cli {
            config: None,
            verbose,
            quiet,
            acting_as: None,
            command: Command::Status(StatusCommand { json: false }),
        }
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "sitegate");
    }

    #[test]
    fn test_verbosity_levels() {
        use crate::logging::Verbosity;
        assert_eq!(status_cli(0, true).verbosity(), Verbosity::Quiet);
        assert_eq!(status_cli(0, false).verbosity(), Verbosity::Normal);
        assert_eq!(status_cli(1, false).verbosity(), Verbosity::Verbose);
        assert_eq!(status_cli(3, false).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_acting_as_after_subcommand() {
        let args = ["sitegate", "compliance", "status", "--as", "jo@example.com"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.acting_as.as_deref(), Some("jo@example.com"));
        assert!(matches!(
            cli.command,
            Command::Compliance(ComplianceCommand::Status { .. })
        ));
    }

    #[test]
    fn test_parse_rams_issue_with_work_types() {
        let args = [
            "sitegate",
            "rams",
            "issue",
            "--reference",
            "RAMS-012",
            "--title",
            "Working at height",
            "--work-type",
            "scaffolding",
            "--work-type",
            "roofing",
            "--file",
            "wah.txt",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        match cli.command {
            Command::Rams(RamsCommand::Issue {
                work_types,
                min_read,
                risk,
                ..
            }) => {
                assert_eq!(work_types, vec!["scaffolding", "roofing"]);
                assert_eq!(min_read, 60);
                assert_eq!(risk, RiskArg::Medium);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rams_issue_needs_a_work_type() {
        let args = [
            "sitegate", "rams", "issue", "--reference", "R1", "--title", "T", "--file", "f",
        ];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_delivery_calendar_needs_both_dates() {
        let args = ["sitegate", "delivery", "list", "--from", "2026-03-01"];
        assert!(Cli::try_parse_from(args).is_err());

        let args = [
            "sitegate",
            "delivery",
            "list",
            "--from",
            "2026-03-01",
            "--to",
            "2026-03-07",
        ];
        assert!(Cli::try_parse_from(args).is_ok());
    }

    #[test]
    fn test_parse_notification_read_all() {
        let args = ["sitegate", "notification", "read-all"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Notification(NotificationCommand::ReadAll)
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let args = ["sitegate", "-c", "/custom/config.toml", "status"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_notice_type_flag() {
        let args = [
            "sitegate", "notice", "post", "--title", "Lift", "--body", "Crane", "--type", "dabs",
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        assert!(matches!(
            cli.command,
            Command::Notice(NoticeCommand::Post {
                notice_type: NoticeTypeArg::Dabs,
                ..
            })
        ));
    }
}
