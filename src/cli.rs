//! Command-line interface built on clap.
//!
//! Defines [`Cli`] with the [`Command`] subcommands (run, pending, rules)
//! and global flags (--config, --policy, --verbose).

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::oms::PendingFilter;
use crate::rules::MatchPolicy;

/// Classifies pending OMS outages by duration and submits their fault reasons.
#[derive(Debug, Parser)]
#[command(name = "oms-reasoner", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "oms.toml")]
    pub config: PathBuf,

    /// Overrides the configured policy for durations past every bucket.
    #[arg(long, global = true)]
    pub policy: Option<PolicyArg>,

    /// Enables debug logging.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

/// Policy accepted on the command line, mapped to [`MatchPolicy`].
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PolicyArg {
    /// Skip outages longer than every bucket.
    Strict,
    /// Put outages longer than every bucket into the last one.
    CatchAll,
}

impl From<PolicyArg> for MatchPolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::Strict => MatchPolicy::Strict,
            PolicyArg::CatchAll => MatchPolicy::CatchAll,
        }
    }
}

/// Options shared by every command that reads the pending list.
#[derive(Debug, Clone, Args)]
pub struct FetchArgs {
    /// Maximum number of outages to fetch (0 means all).
    #[arg(long, short, default_value_t = 0)]
    pub limit: usize,

    /// Only outages that occurred on or after this date (YYYY-MM-DD).
    #[arg(long, requires = "to")]
    pub from: Option<NaiveDate>,

    /// Only outages that occurred on or before this date (YYYY-MM-DD).
    #[arg(long, requires = "from")]
    pub to: Option<NaiveDate>,
}

impl FetchArgs {
    pub fn filter(&self) -> PendingFilter {
        match (self.from, self.to) {
            (Some(from), Some(to)) => PendingFilter::between(from, to),
            _ => PendingFilter::default(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classifies pending outages and submits a reason for each.
    Run {
        #[command(flatten)]
        fetch: FetchArgs,

        /// Picks poles but does not submit anything.
        #[arg(long)]
        dry_run: bool,

        /// Seeds pole selection so repeated runs pick the same poles.
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Lists pending outages with their classification, without submitting.
    Pending {
        #[command(flatten)]
        fetch: FetchArgs,
    },

    /// Prints the duration rules in effect.
    Rules,
}
