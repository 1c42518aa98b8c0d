//! Wire vocabulary for the rshell command channel.
//!
//! The channel is deliberately unframed: raw UTF-8 text over a single TCP
//! stream, one command and one reply per exchange. What little protocol
//! exists lives here — the reserved tokens, the per-read buffer sizes, the
//! banner the agent sends on connect, and the fixed texts that stand in for
//! empty or terminal replies.

/// Bytes the agent reads per command. Longer command lines are truncated.
pub const AGENT_RECV_BUF: usize = 1024;

/// Bytes the listener reads per reply. Larger outputs are truncated.
pub const LISTENER_RECV_BUF: usize = 4096;

/// In-band session terminator, matched case-insensitively on both sides.
pub const EXIT_COMMAND: &str = "exit";

/// Commands with this prefix change the agent's working directory locally
/// and are never forwarded to the shell.
pub const CD_PREFIX: &str = "cd ";

/// Sent in place of an empty result so the listener always receives one
/// reply per command.
pub const NO_OUTPUT_SENTINEL: &str = "(command produced no output)\n";

/// Acknowledgment the agent sends before closing on `exit`.
pub const CLOSE_ACK: &str = "Connection closed.\n";

/// The first line the agent sends after connecting.
pub fn banner(hostname: &str) -> String {
    format!("Connected! (Host: {})\n", hostname)
}

/// One operator command, as the agent interprets it.
///
/// A command whose literal text is `exit` can never be executed remotely;
/// the token is reserved in-band and there is no escaping scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Close the session.
    Exit,
    /// Change the agent's working directory.
    ChangeDir(String),
    /// Anything else, forwarded to the platform shell verbatim.
    Shell(String),
}

impl Command {
    /// Parse raw command text. Returns `None` for blank input, which the
    /// receive loop skips without replying.
    pub fn parse(input: &str) -> Option<Command> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.eq_ignore_ascii_case(EXIT_COMMAND) {
            return Some(Command::Exit);
        }
        if let Some(path) = trimmed.strip_prefix(CD_PREFIX) {
            return Some(Command::ChangeDir(path.trim().to_string()));
        }
        Some(Command::Shell(trimmed.to_string()))
    }
}

/// Captured output of one executed command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionResult {
    /// The text sent back to the operator: stderr when non-empty, otherwise
    /// stdout. An empty render means the caller substitutes
    /// [`NO_OUTPUT_SENTINEL`] on the wire.
    pub fn render(&self) -> &str {
        if !self.stderr.is_empty() {
            &self.stderr
        } else {
            &self.stdout
        }
    }
}
