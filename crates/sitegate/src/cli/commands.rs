//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands. Users are named
//! by email on the command line; every other record by its numeric id, except
//! RAMS documents, which go by series reference.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Subcommand, ValueEnum};

use crate::rams::RiskLevel;
use crate::records::notices::NoticeType;
use crate::records::projects::ProjectStatus;
use crate::records::Priority;
use crate::session::Role;

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// User administration commands.
#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// Add a user; on an empty site the first user becomes the administrator
    Add {
        /// Login email
        #[arg(long)]
        email: String,

        /// Full name
        #[arg(long)]
        name: String,

        /// Access role
        #[arg(long, value_enum)]
        role: Option<RoleArg>,

        /// Contact number
        #[arg(long)]
        phone: Option<String>,

        /// Trade, e.g. bricklayer
        #[arg(long)]
        trade: Option<String>,
    },

    /// List users
    List {
        /// Only users with this role
        #[arg(long, value_enum)]
        role: Option<RoleArg>,

        /// Free-text search over name, email and trade
        #[arg(short, long)]
        search: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Change a user's role
    Role {
        /// User email
        email: String,

        /// New role
        #[arg(value_enum)]
        role: RoleArg,
    },

    /// Deactivate a user
    Deactivate {
        /// User email
        email: String,
    },

    /// Reactivate a user
    Activate {
        /// User email
        email: String,
    },
}

/// Project, plot and work commands.
#[derive(Debug, Subcommand)]
pub enum ProjectCommand {
    /// Create a project
    Add {
        /// Short unique code
        #[arg(long)]
        code: String,

        /// Project name
        #[arg(long)]
        name: String,

        /// Site address
        #[arg(long)]
        location: Option<String>,
    },

    /// List projects
    List {
        /// Only projects in this status
        #[arg(long, value_enum)]
        status: Option<ProjectStatusArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Change a project's status
    SetStatus {
        /// Project id
        id: i64,

        /// New status
        #[arg(value_enum)]
        status: ProjectStatusArg,
    },

    /// Add a plot to a project, or list its plots when no number is given
    Plot {
        /// Project id
        project: i64,

        /// Plot number
        #[arg(long)]
        number: Option<String>,

        /// House type
        #[arg(long)]
        house_type: Option<String>,
    },

    /// Assign work on a plot
    Assign {
        /// Plot id
        #[arg(long)]
        plot: i64,

        /// Operative email
        #[arg(long)]
        user: String,

        /// Work type, e.g. brickwork
        #[arg(long)]
        work_type: String,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
    },

    /// List work assignments
    Assignments {
        /// Only this operative's assignments
        #[arg(long)]
        user: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Log units of work against an assignment
    Log {
        /// Assignment id
        #[arg(long)]
        assignment: i64,

        /// Units completed
        #[arg(long)]
        units: u32,

        /// Hours worked
        #[arg(long)]
        hours: f64,

        /// Notes
        #[arg(long)]
        notes: Option<String>,

        /// Mark the assignment complete
        #[arg(long)]
        complete: bool,
    },

    /// Units leaderboard
    Leaderboard {
        /// Only count this work type
        #[arg(long)]
        work_type: Option<String>,
    },

    /// Rank operatives for a work type
    Suggest {
        /// Work type
        work_type: String,

        /// Number of candidates to show
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },
}

/// RAMS document, register and signing commands.
#[derive(Debug, Subcommand)]
pub enum RamsCommand {
    /// Issue version 1 of a new document
    Issue {
        /// Series reference, e.g. RAMS-012
        #[arg(long)]
        reference: String,

        /// Title
        #[arg(long)]
        title: String,

        /// Work type covered (repeatable)
        #[arg(long = "work-type", required = true)]
        work_types: Vec<String>,

        /// Assessed risk
        #[arg(long, value_enum, default_value = "medium")]
        risk: RiskArg,

        /// Minimum reading time in seconds
        #[arg(long, default_value = "60")]
        min_read: u32,

        /// File holding the document text
        #[arg(long)]
        file: PathBuf,

        /// Let signatures carry over to later versions
        #[arg(long)]
        keep_signatures: bool,
    },

    /// Issue the next version of a document
    Revise {
        /// Series reference
        reference: String,

        /// File holding the new document text
        #[arg(long)]
        file: PathBuf,

        /// New title
        #[arg(long)]
        title: Option<String>,

        /// Replacement work types (repeatable)
        #[arg(long = "work-type")]
        work_types: Vec<String>,

        /// New risk level
        #[arg(long, value_enum)]
        risk: Option<RiskArg>,

        /// New minimum reading time in seconds
        #[arg(long)]
        min_read: Option<u32>,

        /// Let signatures on earlier versions satisfy this one
        #[arg(long)]
        keep_signatures: bool,
    },

    /// List documents
    List {
        /// Include superseded versions
        #[arg(short, long)]
        all: bool,

        /// Free-text search over reference, title and work types
        #[arg(short, long)]
        search: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Show the current version of a document
    Show {
        /// Series reference
        reference: String,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Require a contractor to sign a document before an activity
    Assign {
        /// Series reference
        reference: String,

        /// Contractor email
        #[arg(long)]
        contractor: String,

        /// Activity the document gates
        #[arg(long)]
        activity: String,
    },

    /// Expire a register entry
    Withdraw {
        /// Register entry id
        entry: i64,
    },

    /// Read and sign a document as the acting user
    Read {
        /// Series reference
        reference: String,

        /// Signature text; prompted for when omitted
        #[arg(long)]
        signature: Option<String>,

        /// Fast-forward the timer, where configuration allows it
        #[arg(long)]
        skip: bool,
    },

    /// List captured signatures
    Signatures {
        /// Only this contractor's signatures
        #[arg(long)]
        contractor: Option<String>,

        /// Only this series
        #[arg(long)]
        reference: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Compliance commands.
#[derive(Debug, Subcommand)]
pub enum ComplianceCommand {
    /// Show a contractor's compliance
    Status {
        /// Contractor email; defaults to the acting user
        #[arg(long)]
        contractor: Option<String>,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Check whether a contractor may start an activity
    Gate {
        /// Activity name
        activity: String,

        /// Contractor email; defaults to the acting user
        #[arg(long)]
        contractor: Option<String>,
    },
}

/// Delivery commands.
#[derive(Debug, Subcommand)]
pub enum DeliveryCommand {
    /// Request a delivery
    Request {
        /// Project id
        #[arg(long)]
        project: i64,

        /// Supplier
        #[arg(long)]
        supplier: String,

        /// Items being delivered
        #[arg(long)]
        items: String,

        /// Delivery date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,

        /// Time slot, e.g. 08:00-10:00
        #[arg(long)]
        slot: Option<String>,

        /// Notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// List deliveries, or the calendar between two dates
    List {
        /// Only this project
        #[arg(long)]
        project: Option<i64>,

        /// Only this status, e.g. requested or approved
        #[arg(long)]
        status: Option<String>,

        /// Calendar start (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<NaiveDate>,

        /// Calendar end (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<NaiveDate>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Approve a requested delivery
    Approve {
        /// Delivery id
        id: i64,
    },

    /// Reject a requested delivery
    Reject {
        /// Delivery id
        id: i64,

        /// Reason given to the requester
        #[arg(long)]
        reason: String,
    },

    /// Record an approved delivery as arrived
    Deliver {
        /// Delivery id
        id: i64,

        /// Proof of delivery reference
        #[arg(long)]
        pod: Option<String>,
    },

    /// Cancel a delivery
    Cancel {
        /// Delivery id
        id: i64,
    },
}

/// Site notice commands.
#[derive(Debug, Subcommand)]
pub enum NoticeCommand {
    /// Post a notice
    Post {
        /// Headline
        #[arg(long)]
        title: String,

        /// Body text
        #[arg(long)]
        body: String,

        /// Notice type
        #[arg(long = "type", value_enum, default_value = "general")]
        notice_type: NoticeTypeArg,

        /// Priority
        #[arg(long, value_enum, default_value = "normal")]
        priority: PriorityArg,

        /// Project id; site-wide when omitted
        #[arg(long)]
        project: Option<i64>,

        /// Hours until the notice expires
        #[arg(long)]
        expires_in_hours: Option<u32>,
    },

    /// List notices
    List {
        /// Project board; site-wide notices are always included
        #[arg(long)]
        project: Option<i64>,

        /// Include expired notices
        #[arg(short, long)]
        all: bool,

        /// Only this notice type
        #[arg(long = "type", value_enum)]
        notice_type: Option<NoticeTypeArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Take a notice down
    Remove {
        /// Notice id
        id: i64,
    },
}

/// Notification feed commands for the acting user.
#[derive(Debug, Subcommand)]
pub enum NotificationCommand {
    /// Show notifications
    List {
        /// Only unread notifications
        #[arg(short, long)]
        unread: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Mark a notification read
    Read {
        /// Notification id
        id: i64,
    },

    /// Mark every notification read
    ReadAll,
}

/// Qualification commands.
#[derive(Debug, Subcommand)]
pub enum QualificationCommand {
    /// Record a qualification
    Add {
        /// Qualification name, e.g. CSCS Blue Card
        #[arg(long)]
        name: String,

        /// Holder email; defaults to the acting user
        #[arg(long)]
        user: Option<String>,

        /// Issuing body
        #[arg(long)]
        issuer: Option<String>,

        /// Certificate or card number
        #[arg(long)]
        number: Option<String>,

        /// Issue date (YYYY-MM-DD)
        #[arg(long)]
        issued: Option<NaiveDate>,

        /// Expiry date (YYYY-MM-DD)
        #[arg(long)]
        expires: Option<NaiveDate>,
    },

    /// List qualifications
    List {
        /// Only this holder
        #[arg(long)]
        user: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// List expired and expiring qualifications
    Expiring {
        /// Also send reminders to the holders
        #[arg(long)]
        remind: bool,
    },
}

/// Role argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RoleArg {
    /// Site operative
    Operative,
    /// Site supervisor
    Supervisor,
    /// Site or project manager
    Manager,
    /// Administrator
    Admin,
}

impl From<RoleArg> for Role {
    fn from(arg: RoleArg) -> Self {
        match arg {
            RoleArg::Operative => Self::Operative,
            RoleArg::Supervisor => Self::Supervisor,
            RoleArg::Manager => Self::Manager,
            RoleArg::Admin => Self::Admin,
        }
    }
}

/// Risk level argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RiskArg {
    /// Low risk
    Low,
    /// Medium risk
    Medium,
    /// High risk
    High,
    /// Critical risk
    Critical,
}

impl From<RiskArg> for RiskLevel {
    fn from(arg: RiskArg) -> Self {
        match arg {
            RiskArg::Low => Self::Low,
            RiskArg::Medium => Self::Medium,
            RiskArg::High => Self::High,
            RiskArg::Critical => Self::Critical,
        }
    }
}

/// Project status argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProjectStatusArg {
    /// Not started
    Planning,
    /// Under way
    Active,
    /// Paused
    OnHold,
    /// Finished
    Completed,
}

impl From<ProjectStatusArg> for ProjectStatus {
    fn from(arg: ProjectStatusArg) -> Self {
        match arg {
            ProjectStatusArg::Planning => Self::Planning,
            ProjectStatusArg::Active => Self::Active,
            ProjectStatusArg::OnHold => Self::OnHold,
            ProjectStatusArg::Completed => Self::Completed,
        }
    }
}

/// Notice type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NoticeTypeArg {
    /// General information
    General,
    /// Daily activity briefing
    Dabs,
    /// Safety alert
    Safety,
    /// Toolbox talk
    ToolboxTalk,
    /// Environmental notice
    Environmental,
}

impl From<NoticeTypeArg> for NoticeType {
    fn from(arg: NoticeTypeArg) -> Self {
        match arg {
            NoticeTypeArg::General => Self::General,
            NoticeTypeArg::Dabs => Self::Dabs,
            NoticeTypeArg::Safety => Self::Safety,
            NoticeTypeArg::ToolboxTalk => Self::ToolboxTalk,
            NoticeTypeArg::Environmental => Self::Environmental,
        }
    }
}

/// Priority argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PriorityArg {
    /// Low
    Low,
    /// Normal
    Normal,
    /// High
    High,
    /// Urgent
    Urgent,
}

impl From<PriorityArg> for Priority {
    fn from(arg: PriorityArg) -> Self {
        match arg {
            PriorityArg::Low => Self::Low,
            PriorityArg::Normal => Self::Normal,
            PriorityArg::High => Self::High,
            PriorityArg::Urgent => Self::Urgent,
        }
    }
}

/// Output format for list commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_arg_conversion() {
        assert_eq!(Role::from(RoleArg::Operative), Role::Operative);
        assert_eq!(Role::from(RoleArg::Admin), Role::Admin);
    }

    #[test]
    fn test_notice_type_arg_matches_stored_text() {
        for (arg, text) in [
            (NoticeTypeArg::Dabs, "dabs"),
            (NoticeTypeArg::ToolboxTalk, "toolbox_talk"),
            (NoticeTypeArg::Environmental, "environmental"),
        ] {
            assert_eq!(NoticeType::from(arg).to_string(), text);
        }
    }

    #[test]
    fn test_priority_arg_conversion() {
        assert_eq!(Priority::from(PriorityArg::Urgent), Priority::Urgent);
        assert_eq!(Priority::from(PriorityArg::Low), Priority::Low);
    }

    #[test]
    fn test_risk_arg_conversion() {
        assert_eq!(RiskLevel::from(RiskArg::Critical), RiskLevel::Critical);
    }

    #[test]
    fn test_project_status_arg_conversion() {
        assert_eq!(
            ProjectStatus::from(ProjectStatusArg::OnHold),
            ProjectStatus::OnHold
        );
    }

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_status_command_debug() {
        let cmd = StatusCommand { json: true };
        let debug_str = format!("{cmd:?}");
        assert!(debug_str.contains("json"));
    }
}
