//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - dispatch: claim an item and write its assignment
//! - retrospective: analyze outcomes and propose improvements
//! - scan: list work waiting to be picked up
//! - status: factory dashboard
//! - outcome: record how a piece of work ended

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Factory - dispatch tracked work to role-based workers
#[derive(Parser, Debug)]
#[command(name = "factory")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dispatch an item to a worker role
    Dispatch {
        /// Issue or review request number
        item: u64,

        /// Role to assign (coder, reviewer, qa, security, devops, docs, architect, pm, retrospective)
        role: String,

        /// Treat the item as a review request
        #[arg(long)]
        review: bool,
    },

    /// Analyze outcomes and write the improvement report
    Retrospective {
        /// Add proposed checklist items to the affected role profiles
        #[arg(long)]
        apply: bool,
    },

    /// Scan for ready issues and review requests (exits 1 when work is waiting)
    Scan {
        /// OWNER/REPO to scan instead of the configured repository
        #[arg(short, long)]
        source: Option<String>,
    },

    /// Show queue depth, open work, metrics and health
    Status,

    /// Record the outcome of a dispatched item
    Outcome {
        /// Issue or review request number
        item: u64,

        /// Role that did the work
        role: String,

        /// Result (merged, rejected, abandoned, or any other word)
        result: String,

        /// Reason, typically for rejections
        #[arg(short, long)]
        reason: Option<String>,
    },
}
