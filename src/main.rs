mod aggregate;
mod check;
mod cli;
mod config;
mod diagnostic;
mod dispatch;
mod pipeline;
mod relay;
mod render;

use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Check(args) => {
            let config = Config::load_or_default(&args.config).unwrap_or_else(|e| {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            });
            check::check(args, &config).await
        }
        Commands::Serve(args) => {
            let config = Config::load_or_default(&args.config).unwrap_or_else(|e| {
                eprintln!("Failed to load config: {}", e);
                std::process::exit(1);
            });
            relay::serve(args, &config).await
        }
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
