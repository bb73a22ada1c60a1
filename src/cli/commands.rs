use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::RelayMode;

#[derive(Parser)]
#[command(name = "osbuddy")]
#[command(author, version, about = "OpenSourceBuddy chat relay", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Serve the landing page and the /chat endpoint
    Serve {
        /// Where conversation history lives (default: server.mode from config)
        #[arg(short, long, value_enum)]
        mode: Option<RelayMode>,

        /// Listening port (default: $PORT or 8000)
        #[arg(short, long)]
        port: Option<u16>,

        /// JSON history file for identifier mode
        #[arg(long)]
        store: Option<PathBuf>,

        /// Landing page served at /
        #[arg(long)]
        index: Option<PathBuf>,
    },

    /// Chat from the terminal against the persisted history
    Interactive {
        /// Resume this conversation (a new id is generated otherwise)
        #[arg(short, long)]
        user_id: Option<String>,

        /// JSON history file (default: store.path from config)
        #[arg(long)]
        store: Option<PathBuf>,
    },
}
