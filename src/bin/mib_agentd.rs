//! mib-agentd: serve a plugin-backed MIB tree over SNMPv1.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use mib_agent::agent::Agent;

/// SNMPv1 agent serving a plugin-extensible MIB tree.
#[derive(Debug, Parser)]
#[command(name = "mib-agentd", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:161", value_name = "ADDR")]
    listen: SocketAddr,

    /// Accepted community strings (repeatable).
    #[arg(short, long, default_value = "public", value_name = "NAME")]
    community: Vec<String>,

    /// Maximum UDP read size.
    #[arg(long, default_value_t = 8000, value_name = "BYTES")]
    max_packet: usize,

    /// Reported as sysContact.
    #[arg(long, default_value = "", value_name = "TEXT")]
    sys_contact: String,

    /// Reported as sysName.
    #[arg(long, default_value = "", value_name = "TEXT")]
    sys_name: String,

    /// Reported as sysLocation.
    #[arg(long, default_value = "", value_name = "TEXT")]
    sys_location: String,

    /// Directory of OID-named JSON value files to register (repeatable).
    #[arg(long, value_name = "DIR")]
    plugin_dir: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut agent = Agent::builder()
        .listen(args.listen)
        .max_packet(args.max_packet)
        .communities(args.community.iter().map(String::as_bytes))
        .sys_contact(args.sys_contact)
        .sys_name(args.sys_name)
        .sys_location(args.sys_location)
        .build();

    for dir in &args.plugin_dir {
        if let Err(e) = agent.add_plugin_dir(dir) {
            eprintln!("Error loading plugin dir {}: {e}", dir.display());
            return ExitCode::FAILURE;
        }
    }

    let handle = match agent.start().await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = tokio::signal::ctrl_c().await {
        eprintln!("Error waiting for shutdown signal: {e}");
        return ExitCode::FAILURE;
    }
    handle.shutdown().await;
    ExitCode::SUCCESS
}
