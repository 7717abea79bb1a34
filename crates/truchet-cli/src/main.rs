//! truchet - Truchet tile patterns and path post-processing for plotter SVG.
//!
//! ## Rust Lesson #1: Derive-based argument parsing
//!
//! `#[derive(Parser)]` turns a plain struct into a command line parser.
//! Doc comments become `--help` text, and each subcommand is an enum
//! variant carrying its own argument struct.

mod cli;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use cli::{JoinArgs, TileArgs, cmd_join, cmd_tile};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a Truchet pattern from the <symbol>s of an SVG file
    Tile(TileArgs),
    /// Join touching paths of an SVG file into continuous paths
    Join(JoinArgs),
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Tile(args) => cmd_tile(args),
        Command::Join(args) => cmd_join(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
