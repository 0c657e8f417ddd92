mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{build, lookup, series, variables};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

fn init_logging(verbose: u8) -> anyhow::Result<()> {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match &cli.command {
        Commands::Build(args) => build::run(&cli, args),
        Commands::Lookup(args) => lookup::run(&cli, args),
        Commands::Series(args) => series::run(&cli, args),
        Commands::Variables => variables::run(&cli),
    }
}

fn main() -> anyhow::Result<()> { run() }
