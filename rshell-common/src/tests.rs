#[cfg(test)]
mod connection_tests {
    use crate::connection::{bind_single, connect_with_retry, Connection};
    use std::net::{IpAddr, Ipv4Addr};
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio::time::timeout;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn send_and_recv_round_trip() {
        let listener = bind_single(LOCALHOST, 0).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let peer = tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut conn = Connection::new(stream).unwrap();
            conn.send(b"hello from peer").await.unwrap();
            conn.recv(1024).await.unwrap()
        });

        let mut conn = listener.accept_one().await.unwrap();
        let received = conn.recv(1024).await.unwrap();
        assert_eq!(received.as_deref(), Some("hello from peer"));

        conn.send(b"hello back").await.unwrap();
        let echoed = peer.await.unwrap();
        assert_eq!(echoed.as_deref(), Some("hello back"));
    }

    #[tokio::test]
    async fn recv_returns_none_on_peer_close() {
        let listener = bind_single(LOCALHOST, 0).await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            drop(stream);
        });

        let mut conn = listener.accept_one().await.unwrap();
        let received = conn.recv(1024).await.unwrap();
        assert_eq!(received, None);
    }

    #[tokio::test]
    async fn recv_truncates_at_buffer_size() {
        let listener = bind_single(LOCALHOST, 0).await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut conn = Connection::new(stream).unwrap();
            conn.send(&[b'x'; 64]).await.unwrap();
        });

        let mut conn = listener.accept_one().await.unwrap();
        let received = conn.recv(16).await.unwrap().unwrap();
        assert_eq!(received.len(), 16);
    }

    #[tokio::test]
    async fn connect_with_retry_survives_failed_attempts() {
        // Learn a free port, then leave it unbound while the dialer fails
        // several attempts against it.
        let probe = bind_single(LOCALHOST, 0).await.unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let dialer = tokio::spawn(async move {
            connect_with_retry(
                &addr.to_string(),
                Duration::from_millis(50),
                Duration::from_secs(1),
            )
            .await
        });

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!dialer.is_finished());

        let listener = bind_single(LOCALHOST, addr.port()).await.unwrap();
        let accepted = timeout(Duration::from_secs(5), listener.accept_one())
            .await
            .unwrap()
            .unwrap();

        let conn = timeout(Duration::from_secs(5), dialer)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conn.peer_addr().port(), addr.port());
        drop(accepted);
    }

    #[tokio::test]
    async fn second_bind_on_active_port_is_refused() {
        let listener = bind_single(LOCALHOST, 0).await.unwrap();
        let addr = listener.local_addr().unwrap();

        // A second active listener on the same port must be refused.
        let second = bind_single(LOCALHOST, addr.port()).await;
        assert!(second.is_err());
    }
}

#[cfg(test)]
mod exec_tests {
    use crate::exec::{dispatch, CommandRunner, ShellRunner};
    use anyhow::Result;
    use rshell_protocol::{Command, ExecutionResult, NO_OUTPUT_SENTINEL};
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    // The working directory is process-global; cwd tests run serialized.
    static CWD_LOCK: Mutex<()> = Mutex::const_new(());

    struct ScriptedRunner {
        stdout: &'static str,
        stderr: &'static str,
    }

    impl CommandRunner for ScriptedRunner {
        async fn run(&self, _command: &str) -> Result<ExecutionResult> {
            Ok(ExecutionResult {
                stdout: self.stdout.to_string(),
                stderr: self.stderr.to_string(),
            })
        }
    }

    struct FailingRunner;

    impl CommandRunner for FailingRunner {
        async fn run(&self, _command: &str) -> Result<ExecutionResult> {
            Err(anyhow::anyhow!("spawn refused"))
        }
    }

    #[tokio::test]
    async fn stderr_takes_precedence_over_stdout() {
        let runner = ScriptedRunner {
            stdout: "out\n",
            stderr: "err\n",
        };
        let reply = dispatch(&Command::Shell("anything".to_string()), &runner).await;
        assert_eq!(reply, "err\n");
    }

    #[tokio::test]
    async fn stdout_used_when_stderr_empty() {
        let runner = ScriptedRunner {
            stdout: "out\n",
            stderr: "",
        };
        let reply = dispatch(&Command::Shell("anything".to_string()), &runner).await;
        assert_eq!(reply, "out\n");
    }

    #[tokio::test]
    async fn sentinel_sent_when_command_is_silent() {
        let runner = ScriptedRunner {
            stdout: "",
            stderr: "",
        };
        let reply = dispatch(&Command::Shell("touch file".to_string()), &runner).await;
        assert_eq!(reply, NO_OUTPUT_SENTINEL);
    }

    #[tokio::test]
    async fn spawn_failure_becomes_textual_reply() {
        let reply = dispatch(&Command::Shell("whatever".to_string()), &FailingRunner).await;
        assert!(reply.contains("Error executing command"));
        assert!(reply.contains("spawn refused"));
    }

    #[tokio::test]
    async fn cd_to_missing_directory_reports_and_keeps_cwd() {
        let _guard = CWD_LOCK.lock().await;
        let before = std::env::current_dir().unwrap();

        let reply = dispatch(
            &Command::ChangeDir("/definitely/not/a/real/dir".to_string()),
            &FailingRunner,
        )
        .await;

        assert!(reply.contains("directory not found"));
        assert!(reply.contains("/definitely/not/a/real/dir"));
        assert_eq!(std::env::current_dir().unwrap(), before);
    }

    #[tokio::test]
    async fn cd_to_existing_directory_reports_new_cwd() {
        let _guard = CWD_LOCK.lock().await;
        let before = std::env::current_dir().unwrap();
        let dir = TempDir::new().unwrap();
        let canonical = dir.path().canonicalize().unwrap();

        let reply = dispatch(
            &Command::ChangeDir(dir.path().display().to_string()),
            &FailingRunner,
        )
        .await;

        assert!(reply.contains("Changed directory to"));
        assert!(reply.contains(&canonical.display().to_string()));
        assert_eq!(std::env::current_dir().unwrap(), canonical);

        std::env::set_current_dir(before).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_runner_captures_stdout() {
        let result = ShellRunner.run("echo hello").await.unwrap();
        assert_eq!(result.stdout, "hello\n");
        assert_eq!(result.stderr, "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn shell_runner_captures_stderr() {
        let result = ShellRunner.run("echo oops >&2").await.unwrap();
        assert_eq!(result.stderr, "oops\n");
        assert_eq!(result.render(), "oops\n");
    }
}
