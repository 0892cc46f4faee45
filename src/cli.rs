use crate::calendar::WeekStart;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "duecal", version, about = "Personal task tracker with a month calendar")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Args, Debug)]
pub struct GlobalArgs {
    /// User name (selects the task file together with the passphrase)
    #[arg(long, env = "DUECAL_NAME", global = true)]
    pub name: Option<String>,
    /// Passphrase (not secret: it only picks the task file)
    #[arg(long, env = "DUECAL_PASSPHRASE", global = true, hide_env_values = true)]
    pub passphrase: Option<String>,
    /// Directory holding the task files
    #[arg(long, env = "DUECAL_DATA_DIR", global = true)]
    pub data_dir: Option<PathBuf>,
    /// First day of the calendar week
    #[arg(long, value_enum, global = true)]
    pub week_start: Option<WeekStart>,
    /// Path to a config.yml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Add a new task
    Add {
        /// Title of the task
        title: String,
        /// Category used for grouping
        #[arg(long, short = 'c', default_value = "")]
        category: String,
        /// Due date in YYYY-MM-DD format (defaults to today)
        #[arg(long)]
        due: Option<String>,
        /// Time bucket: "> 45 Minutes", "15-45 Minutes" or "< 15 Minutes"
        #[arg(long, short = 'p')]
        priority: Option<String>,
        /// Optional description
        #[arg(long, short = 'd')]
        description: Option<String>,
    },
    /// List tasks grouped by category
    List,
    /// Print a month calendar
    Calendar {
        #[arg(long)]
        year: Option<i32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..=12))]
        month: Option<u32>,
    },
    /// Show the tasks due on a day
    Day {
        /// Date in YYYY-MM-DD format (defaults to today)
        date: Option<String>,
    },
    /// Flip a task between open and completed
    Toggle {
        /// Task id as shown by `list` or `day`
        id: u64,
    },
    /// Mark a task completed (or open again with --reopen)
    Complete {
        /// Task id as shown by `list` or `day`
        id: u64,
        #[arg(long)]
        reopen: bool,
    },
    /// Delete a task
    Delete {
        /// Task id as shown by `list` or `day`
        id: u64,
    },
    /// Launch the interactive TUI
    Tui,
}
