use anyhow::Result;

use crate::audio::probe::is_professional_backend_listed;
use crate::audio::{BackendKind, CpalHostRegistry, HostApiRegistry};

pub mod args;
pub mod listen;

pub use args::{Cli, CliCommand, ListenCliArgs};
pub use listen::handle_listen_command;

pub fn handle_hosts_command() -> Result<()> {
    let registry = CpalHostRegistry;
    let names = registry.host_api_names()?;

    if names.is_empty() {
        println!("No usable host APIs found.");
    } else {
        println!("Host APIs:");
        for name in &names {
            println!("  {}", name);
        }
    }

    let kind = if is_professional_backend_listed(&names) {
        BackendKind::Professional
    } else {
        BackendKind::General
    };
    println!("Selected backend: {}", kind);
    Ok(())
}
