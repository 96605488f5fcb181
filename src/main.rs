use anyhow::Result;
use clap::Parser;
use hear::cli::{handle_hosts_command, handle_listen_command, Cli, CliCommand};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let log_level = if cli.verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(CliCommand::Version) => {
            println!("hear {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Some(CliCommand::Hosts) => handle_hosts_command(),
        Some(CliCommand::Listen(args)) => handle_listen_command(args, cli.config.as_deref()),
        None => handle_listen_command(Default::default(), cli.config.as_deref()),
    }
}
