mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{capture, CaptureArgs};

/// Sectionshot - per-section screenshots of live web pages
#[derive(Parser, Debug)]
#[command(name = "sectionshot")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture page sections on desktop and/or mobile
    Capture(CaptureArgs),
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Capture(args) => capture(args),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
