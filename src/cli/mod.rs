//! CLI module for the Dispatch Gateway
//!
//! Provides subcommands for:
//! - `serve`: run the HTTP gateway
//! - `keys`: manage API keys directly against the credential store

pub mod keys;
pub mod serve;

use clap::{Parser, Subcommand};

/// Dispatch Gateway - API-key protected message fan-out
#[derive(Parser)]
#[command(name = "dispatch-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP gateway
    Serve,

    /// Manage API keys without the server running
    Keys(keys::KeysArgs),
}
