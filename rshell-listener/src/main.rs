mod console;

use anyhow::{Context, Result};
use clap::Parser;
use rshell_common::connection::{bind_single, Connection};
use rshell_protocol::{EXIT_COMMAND, LISTENER_RECV_BUF};
use std::io::Write;
use std::net::IpAddr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::info;

#[derive(Parser)]
#[command(name = "rshell-listener")]
#[command(about = "Operator-side listener: accepts one agent callback and drives the shell")]
struct Args {
    /// Port to listen on
    #[arg(short, long)]
    port: u16,

    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0")]
    ip: IpAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let listener = bind_single(args.ip, args.port)
        .await
        .with_context(|| format!("failed to bind {}:{}", args.ip, args.port))?;

    console::info(&format!("Listening on {}:{}", args.ip, args.port));
    println!("Waiting for the agent to call back...");

    let conn = tokio::select! {
        accepted = listener.accept_one() => accepted?,
        _ = signal::ctrl_c() => {
            console::warn("Interrupted before a connection arrived.");
            return Ok(());
        }
    };

    console::success(&format!("Connection received from {}", conn.peer_addr()));
    info!("Session established with {}", conn.peer_addr());

    shell_loop(conn).await;
    Ok(())
}

/// Interactive request/response loop. Strictly one command in flight: send,
/// then wait for exactly one reply. The listener never reconnects on its own;
/// when the session dies the operator re-invokes it.
async fn shell_loop(mut conn: Connection) {
    let mut stdin = BufReader::new(tokio::io::stdin());
    let prompt = console::prompt(&conn.peer_addr().ip().to_string());

    loop {
        print!("{}", prompt);
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        tokio::select! {
            read = stdin.read_line(&mut line) => {
                match read {
                    Ok(0) => {
                        console::warn("Input closed. Ending session.");
                        return;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        console::error(&format!("Failed to read input: {}", e));
                        return;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                println!();
                console::warn("Interrupt detected. Type 'exit' to close the shell.");
                continue;
            }
        }

        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        if command.eq_ignore_ascii_case(EXIT_COMMAND) {
            console::info("Sending 'exit' to the agent...");
            if let Err(e) = conn.send(command.as_bytes()).await {
                console::error(&format!("Failed to notify the agent: {}", e));
            }
            return;
        }

        if let Err(e) = conn.send(command.as_bytes()).await {
            console::error(&format!("Connection lost: {}", e));
            return;
        }

        tokio::select! {
            reply = conn.recv(LISTENER_RECV_BUF) => {
                match reply {
                    Ok(Some(output)) => println!("{}", output),
                    Ok(None) => {
                        console::error("Connection closed by the agent.");
                        return;
                    }
                    Err(e) => {
                        console::error(&format!("Connection lost: {}", e));
                        return;
                    }
                }
            }
            _ = signal::ctrl_c() => {
                println!();
                console::warn("Interrupted while waiting for output.");
            }
        }
    }
}
