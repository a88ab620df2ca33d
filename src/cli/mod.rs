//! CLI module for rhythmee.
//!
//! This module provides the command-line interface:
//! - `commands`: Command definitions using clap derive
//! - `display`: Output formatting and display logic

pub mod commands;
pub mod display;

pub use commands::{
    AlarmAddArgs, AlarmCommands, Cli, Commands, FavoriteCommands, ListenArgs, SearchArgs,
};
pub use display::Display;
