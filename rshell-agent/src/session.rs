use anyhow::Result;
use rshell_common::connection::{connect_with_retry, Connection};
use rshell_common::exec::{dispatch, CommandRunner};
use rshell_protocol::{banner, Command, AGENT_RECV_BUF, CLOSE_ACK};
use std::time::Duration;
use tracing::{info, warn};

/// Outer agent loop: connect (retrying forever), announce, run one session.
/// A dropped connection starts over; only an operator `exit` ends the loop.
pub async fn run_agent<R: CommandRunner>(
    addr: &str,
    hostname: &str,
    runner: &R,
    retry_interval: Duration,
    connect_timeout: Duration,
) -> Result<()> {
    loop {
        let mut conn = connect_with_retry(addr, retry_interval, connect_timeout).await;

        if let Err(e) = conn.send(banner(hostname).as_bytes()).await {
            warn!("Failed to send banner: {}. Reconnecting", e);
            continue;
        }

        match run_session(&mut conn, runner).await {
            Ok(()) => {
                info!("Session closed by operator");
                return Ok(());
            }
            Err(e) => warn!("Connection lost: {}. Reconnecting", e),
        }
    }
}

/// One connected session: receive a command, execute it, reply. Returns
/// `Ok(())` on operator `exit`; transport failures bubble up so the caller
/// can reconnect.
async fn run_session<R: CommandRunner>(conn: &mut Connection, runner: &R) -> Result<()> {
    loop {
        let text = match conn.recv(AGENT_RECV_BUF).await? {
            Some(text) => text,
            None => anyhow::bail!("peer closed the connection"),
        };

        let command = match Command::parse(&text) {
            Some(command) => command,
            None => continue,
        };

        if command == Command::Exit {
            conn.send(CLOSE_ACK.as_bytes()).await?;
            return Ok(());
        }

        let reply = dispatch(&command, runner).await;
        conn.send(reply.as_bytes()).await?;
    }
}
