// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use freehand_camera::{CameraFacing, FreeHandPlan};
use std::path::PathBuf;
use std::time::Duration;

mod cli;

#[derive(Parser)]
#[command(name = "freehand-camera")]
#[command(about = "Hands-free camera: single, burst and free-hand capture")]
#[command(version = freehand_camera::constants::app_info::version())]
struct Cli {
    /// Config file (default: <config dir>/freehand-camera/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available cameras
    List,

    /// Show the sizes a camera offers and the ones selected
    Sizes {
        /// Camera to use: back/front or 0/1
        #[arg(short, long, default_value = "back")]
        camera: CameraFacing,
    },

    /// Take a photo
    Photo {
        /// Camera to use: back/front or 0/1
        #[arg(short, long, default_value = "back")]
        camera: CameraFacing,

        /// Output directory (default: ~/Pictures/Freehand)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Take photos continuously
    Burst {
        /// Camera to use: back/front or 0/1
        #[arg(short, long, default_value = "back")]
        camera: CameraFacing,

        /// Burst duration in seconds
        #[arg(short, long, default_value = "3")]
        duration: u64,

        /// Output directory (default: ~/Pictures/Freehand)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Count down, then take a fixed number of photos
    FreeHand {
        /// Camera to use: back/front or 0/1
        #[arg(short, long, default_value = "back")]
        camera: CameraFacing,

        /// Number of photos
        #[arg(short = 'n', long, default_value = "5")]
        count: u32,

        /// Milliseconds between two photos
        #[arg(long, default_value = "1000")]
        distance: u64,

        /// Countdown in milliseconds
        #[arg(long, default_value = "3000")]
        delay: u64,

        /// Output directory (default: ~/Pictures/Freehand)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=freehand_camera=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = cli::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::List => cli::list_cameras(&config),
        Commands::Sizes { camera } => cli::show_sizes(camera, &config),
        Commands::Photo { camera, output } => cli::take_photo(camera, output, config),
        Commands::Burst {
            camera,
            duration,
            output,
        } => cli::run_burst(camera, duration, output, config),
        Commands::FreeHand {
            camera,
            count,
            distance,
            delay,
            output,
        } => {
            let plan = FreeHandPlan {
                amount: count,
                distance: Duration::from_millis(distance),
                delay: Duration::from_millis(delay),
            };
            cli::run_free_hand(camera, plan, output, config)
        }
    }
}
