//! CLI command definitions for chassis
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod inspect;

use crate::format::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Layered configuration loader and inspector
#[derive(Parser, Debug)]
#[command(name = "chassis", author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file, repeatable, lowest priority first
    #[arg(short, long = "config", value_name = "FILE", global = true)]
    pub config: Vec<PathBuf>,

    /// Override a key, repeatable, always wins over files
    #[arg(short = 'D', long = "define", value_name = "KEY=VALUE", global = true)]
    pub define: Vec<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List every resolved key with its winning source (default)
    Keys {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Print the values of one path
    Get {
        /// Absolute (`/a.b`) or root-relative (`a.b`) path
        path: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

impl Default for Command {
    fn default() -> Self {
        Command::Keys {
            format: OutputFormat::Text,
        }
    }
}
