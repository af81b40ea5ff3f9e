// SPDX-License-Identifier: MIT
//! Argument parsing (spec §6.3), grounded in the teacher's `src/cli.rs` split
//! between a flat top-level `Cli` and a `Commands` subcommand enum.
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "agentx",
    about = "Multi-tenant runtime for conversational AI agents",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Gateway URL to connect to in `chat` mode (default: ws://127.0.0.1:<port>/ws).
    #[arg(long, value_name = "URL")]
    pub server: Option<String>,

    /// Server listen port (no subcommand) or the port `chat` connects to when
    /// `--server` is omitted. Defaults to 5200 (spec §6.3/§6.4).
    #[arg(long, short = 'p', value_name = "N")]
    pub port: Option<u16>,

    /// Color theme for `chat` mode's terminal output.
    #[arg(long, value_name = "NAME", default_value = "default")]
    pub theme: String,

    /// Increase log verbosity (-v = debug, -vv = trace).
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Connect to a running agentx gateway and chat with an agent.
    Chat {
        /// Definition name to run when starting a fresh agent.
        #[arg(long, default_value = "assistant")]
        definition: String,
    },
}
