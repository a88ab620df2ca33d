//! Command definitions for the rhythmee CLI.
//!
//! Uses clap derive macro for argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::alarms::AlarmTime;

// ============================================================================
// CLI Structure
// ============================================================================

/// rhythmee - internet-radio alarm clock
#[derive(Parser, Debug)]
#[command(
    name = "rhythmee",
    version,
    about = "インターネットラジオ目覚ましCLI",
    long_about = "インターネットラジオで起こしてくれる目覚ましエンジン。\n\
                  アラーム管理、ステーション検索、プレビュー再生、スリープタイマーを提供します。",
    propagate_version = true
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output for debugging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Data directory override (default: ~/.rhythmee)
    #[arg(long, global = true, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

// ============================================================================
// Subcommands
// ============================================================================

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Manage alarms
    Alarm {
        /// Alarm operation
        #[command(subcommand)]
        command: AlarmCommands,
    },

    /// Search radio stations
    Search(SearchArgs),

    /// List countries by station count
    Countries,

    /// List popular station tags
    Tags,

    /// Preview a station, optionally with a sleep timer
    Listen(ListenArgs),

    /// Manage favorite stations
    Favorite {
        /// Favorite operation
        #[command(subcommand)]
        command: FavoriteCommands,
    },

    /// Run the alarm daemon (foreground)
    Daemon,

    /// Generate shell completion scripts
    Completions {
        /// Shell type for completion script
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Alarm subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AlarmCommands {
    /// Add an alarm
    Add(AlarmAddArgs),

    /// List all alarms
    List,

    /// Remove an alarm by id
    Remove {
        /// Alarm id
        id: Uuid,
    },

    /// Enable an alarm
    Enable {
        /// Alarm id
        id: Uuid,
    },

    /// Disable an alarm
    Disable {
        /// Alarm id
        id: Uuid,
    },

    /// Postpone an alarm by a number of minutes
    Snooze {
        /// Alarm id
        id: Uuid,

        /// Minutes to postpone
        #[arg(
            short,
            long,
            default_value = "9",
            value_parser = clap::value_parser!(u32).range(1..=180)
        )]
        minutes: u32,
    },
}

/// Favorite subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum FavoriteCommands {
    /// Toggle a station (first search hit) as favorite
    Toggle {
        /// Station name query
        query: String,
    },

    /// List favorite stations
    List,
}

// ============================================================================
// Command Arguments
// ============================================================================

/// Arguments for `alarm add`
#[derive(Args, Debug, Clone)]
pub struct AlarmAddArgs {
    /// Ring time, HH:MM (local time)
    #[arg(short, long)]
    pub time: AlarmTime,

    /// Alarm label
    #[arg(short, long, default_value = "アラーム")]
    pub label: String,

    /// Repeat weekdays, comma separated (1=月 .. 7=日); empty = one-shot
    #[arg(short, long, value_delimiter = ',')]
    pub days: Vec<u8>,

    /// Station name query; the first search hit is attached to the alarm
    #[arg(short, long)]
    pub station: Option<String>,
}

/// Arguments for `search`
#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Station name query
    pub query: String,

    /// Country filter
    #[arg(short, long)]
    pub country: Option<String>,

    /// Tag filter
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Maximum number of results
    #[arg(
        short,
        long,
        default_value = "20",
        value_parser = clap::value_parser!(u32).range(1..=500)
    )]
    pub limit: u32,
}

/// Arguments for `listen`
#[derive(Args, Debug, Clone)]
pub struct ListenArgs {
    /// Station name query; the first search hit is played
    pub query: String,

    /// Stop playback after this many minutes
    #[arg(
        short,
        long,
        value_parser = clap::value_parser!(u32).range(1..=24 * 60)
    )]
    pub sleep: Option<u32>,
}

// ============================================================================
// Tests
// ============================================================================
