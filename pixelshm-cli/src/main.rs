// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! pixelshm CLI
//!
//! Command-line interface for creating, inspecting and poking a shared canvas.

use clap::{Parser, Subcommand};

mod commands;

use commands::watch::MAX_FPS;
use commands::{parse_rgba, Target};

/// pixelshm - Shared-memory pixel canvas for Pixelflut servers
#[derive(Parser)]
#[command(name = "pixelshm")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Shared memory segment name (overrides the configuration file)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the canvas segment, or attach to it if it already matches
    Create {
        /// Canvas width in pixels
        #[arg(long)]
        width: Option<u16>,

        /// Canvas height in pixels
        #[arg(long)]
        height: Option<u16>,
    },

    /// Show the layout and state of an existing canvas
    Info {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write one pixel
    Set {
        x: u16,
        y: u16,
        /// Color as RRGGBB or RRGGBBAA hex
        #[arg(value_parser = parse_rgba)]
        rgba: u32,
    },

    /// Read one pixel
    Get { x: u16, y: u16 },

    /// Paint the whole canvas with one color
    Fill {
        /// Color as RRGGBB or RRGGBBAA hex
        #[arg(value_parser = parse_rgba)]
        rgba: u32,
    },

    /// List the occupied port statistics slots
    Ports,

    /// Print frame changes until Ctrl-C
    Watch {
        /// Refresh rate (1-1000)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..=MAX_FPS as i64))]
        fps: u32,
    },

    /// Remove the segment from /dev/shm
    Remove,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt().with_env_filter(log_level).init();

    let target = Target {
        config: cli.config,
        name: cli.name,
    };

    // Dispatch to command handlers
    match cli.command {
        Commands::Create { width, height } => commands::create::execute(&target, width, height).await,
        Commands::Info { json } => commands::info::execute(&target, json).await,
        Commands::Set { x, y, rgba } => commands::pixel::set(&target, x, y, rgba).await,
        Commands::Get { x, y } => commands::pixel::get(&target, x, y).await,
        Commands::Fill { rgba } => commands::pixel::fill(&target, rgba).await,
        Commands::Ports => commands::ports::execute(&target).await,
        Commands::Watch { fps } => commands::watch::execute(&target, fps).await,
        Commands::Remove => commands::remove::execute(&target).await,
    }
}
