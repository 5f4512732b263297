use clap::{Parser, Subcommand};
use std::process;
use tracing::error;

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about = "Compiler pass-sequence autotuner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search for a pass sequence minimizing worst-case benchmark runtime
    Search(cmd::search::SearchArgs),
    /// Print the pass catalog
    Passes(cmd::passes::PassesArgs),
}

fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Search(args) => cmd::search::run(args),
        Commands::Passes(args) => cmd::passes::run(args),
    };

    if let Err(e) = outcome {
        error!("❌ {}", e);
        process::exit(1);
    }
}
