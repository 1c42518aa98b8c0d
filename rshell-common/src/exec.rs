use anyhow::Result;
use rshell_protocol::{Command, ExecutionResult, CLOSE_ACK, NO_OUTPUT_SENTINEL};
use std::io::ErrorKind;
use tracing::debug;

/// Capability seam for running one command line through the platform shell.
/// The session loop stays testable against a scripted implementation.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    async fn run(&self, command: &str) -> Result<ExecutionResult>;
}

/// Runs commands through the real shell, capturing stdout and stderr.
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<ExecutionResult> {
        let output = shell_command(command).output().await?;
        Ok(ExecutionResult {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(unix)]
fn shell_command(command: &str) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell_command(command: &str) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Apply one parsed command and produce the reply text. Execution failures
/// become textual replies, never errors — the agent must not crash on a bad
/// command.
pub async fn dispatch<R: CommandRunner>(command: &Command, runner: &R) -> String {
    match command {
        Command::Exit => CLOSE_ACK.to_string(),
        Command::ChangeDir(path) => change_dir(path),
        Command::Shell(line) => {
            debug!("Executing: {}", line);
            match runner.run(line).await {
                Ok(result) => {
                    let rendered = result.render();
                    if rendered.is_empty() {
                        NO_OUTPUT_SENTINEL.to_string()
                    } else {
                        rendered.to_string()
                    }
                }
                Err(e) => format!("Error executing command: {}\n", e),
            }
        }
    }
}

fn change_dir(path: &str) -> String {
    match std::env::set_current_dir(path) {
        Ok(()) => match std::env::current_dir() {
            Ok(cwd) => format!("Changed directory to: {}\n", cwd.display()),
            Err(e) => format!("Error changing directory: {}\n", e),
        },
        Err(e) if e.kind() == ErrorKind::NotFound => {
            format!("Error: directory not found: {}\n", path)
        }
        Err(e) => format!("Error changing directory: {}\n", e),
    }
}
