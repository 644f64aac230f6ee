//! CLI module - Command-line interface for kinship
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// kinship - registration and referral hierarchy service
#[derive(Parser)]
#[command(name = "kinship")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API and the expiry sweeper
    #[command(alias = "daemon")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Show the upline of an account
    #[command(alias = "up")]
    Ancestors {
        /// Referral code of the account
        code: String,
    },

    /// Show the downline of an account
    #[command(alias = "down")]
    Descendants {
        /// Referral code of the account
        code: String,
        /// Only include members up to this depth
        #[arg(long)]
        max_depth: Option<u32>,
    },

    /// Show downline counts per level
    Team {
        /// Referral code of the account
        code: String,
        /// Only include members up to this depth
        #[arg(long)]
        max_depth: Option<u32>,
    },
}

pub use commands::*;
