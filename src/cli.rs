//! CLI argument parsing via clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Log in to Garmin Connect and make authenticated API calls.
#[derive(Debug, Parser)]
#[command(name = "gconnect", version)]
pub struct Args {
    /// Path to config file (default: ./gconnect.toml or ~/.config/gconnect/gconnect.toml).
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, PartialEq, Eq)]
pub enum Command {
    /// Log in with email and password and save the session.
    Login {
        /// Account email; prompted for when omitted.
        #[arg(short = 'e', long = "email")]
        email: Option<String>,
    },
    /// Show whether a saved session exists and when it expires.
    Status,
    /// Delete the saved session.
    Logout,
    /// Exchange the saved OAuth1 token for a fresh OAuth2 token.
    Refresh,
    /// GET an API path and print the JSON response.
    Get {
        /// API path, e.g. `/userprofile-service/socialProfile`.
        path: String,
    },
}
