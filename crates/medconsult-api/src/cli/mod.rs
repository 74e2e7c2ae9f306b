//! CLI command definitions for the `medconsult` binary.
//!
//! Uses clap derive macros for argument parsing. Resource commands follow a
//! noun-verb pattern (`medconsult consultation create`), pipeline commands
//! are top-level verbs (`medconsult ask`, `medconsult consolidate`).

pub mod condition;
pub mod consultation;
pub mod user;

use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Medical consultation assistant with long-term patient memory.
#[derive(Parser)]
#[command(name = "medconsult", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for verbose, -vv for debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the REST API server.
    Serve {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on.
        #[arg(short, long, default_value = "8710")]
        port: u16,
    },

    /// Manage patients.
    User {
        #[command(subcommand)]
        action: UserCommand,
    },

    /// Manage consultation sessions.
    Consultation {
        #[command(subcommand)]
        action: ConsultationCommand,
    },

    /// Ask a question inside a consultation (runs a full turn).
    Ask {
        /// Consultation to continue.
        #[arg(long)]
        consultation: Uuid,

        /// The patient's question.
        query: String,
    },

    /// Show the chronological timeline of a consultation.
    Timeline {
        /// Consultation id.
        consultation_id: Uuid,
    },

    /// Rewrite the consultation summary if enough new turns are pending.
    Consolidate {
        /// Consultation id.
        consultation_id: Uuid,
    },

    /// Reconcile the patient's condition records with recent turns.
    Reconcile {
        /// Consultation id.
        consultation_id: Uuid,
    },

    /// List a patient's conditions.
    Conditions {
        /// Patient id.
        #[arg(long)]
        user: Uuid,

        /// Only show active conditions.
        #[arg(long)]
        active: bool,
    },
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Register a new patient.
    Create {
        /// Display name.
        #[arg(long)]
        name: String,

        /// Unique email address.
        #[arg(long)]
        email: String,
    },
}

#[derive(Subcommand)]
pub enum ConsultationCommand {
    /// Open a new consultation.
    Create {
        /// Patient id.
        #[arg(long)]
        user: Uuid,

        /// Short heading for the session.
        #[arg(long)]
        heading: String,

        /// Earlier consultation this one follows up on.
        #[arg(long)]
        reference: Option<Uuid>,
    },

    /// List the patient's most recently active consultations.
    #[command(alias = "ls")]
    List {
        /// Patient id.
        #[arg(long)]
        user: Uuid,

        /// Maximum results.
        #[arg(long)]
        limit: Option<u32>,
    },
}

/// Relative age of a timestamp for table cells.
pub(crate) fn format_relative_time(dt: &chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let diff = now - *dt;

    if diff.num_minutes() < 1 {
        "just now".to_string()
    } else if diff.num_hours() < 1 {
        format!("{}m ago", diff.num_minutes())
    } else if diff.num_days() < 1 {
        format!("{}h ago", diff.num_hours())
    } else if diff.num_days() < 30 {
        format!("{}d ago", diff.num_days())
    } else {
        dt.format("%Y-%m-%d").to_string()
    }
}

/// Shorten text to `max` characters for table cells.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
