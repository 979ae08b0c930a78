//! Runs a single shell command under a bounded deadline with a sanitised
//! environment, the building block every gate stage composes.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tracing::warn;

use crate::types::CommandOutput;

/// Runs `command` (a full shell line, e.g. `"npm run typecheck"`) in
/// `workdir`, capped at `deadline`. The environment is cleared and
/// replaced with `PATH` plus `extra_env`, matching the orchestrator's own
/// credential-stripping contract — gate commands never see a user's model
/// API credentials.
pub async fn run_with_deadline(
    command: &str,
    workdir: &str,
    deadline: Duration,
    extra_env: &[(&str, &str)],
) -> CommandOutput {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(workdir)
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .envs(extra_env.iter().copied())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            warn!(command, error = %e, "failed to spawn gate command");
            return CommandOutput {
                command: command.to_string(),
                exit_code: None,
                stdout: String::new(),
                stderr: e.to_string(),
                timed_out: false,
            };
        }
    };

    let mut stdout_pipe = child.stdout.take().expect("piped stdout");
    let mut stderr_pipe = child.stderr.take().expect("piped stderr");

    let run = async {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let (_, _, status) = tokio::join!(
            stdout_pipe.read_to_string(&mut stdout),
            stderr_pipe.read_to_string(&mut stderr),
            child.wait(),
        );
        (stdout, stderr, status)
    };

    match tokio::time::timeout(deadline, run).await {
        Ok((stdout, stderr, Ok(status))) => CommandOutput {
            command: command.to_string(),
            exit_code: status.code(),
            stdout,
            stderr,
            timed_out: false,
        },
        Ok((stdout, stderr, Err(e))) => CommandOutput {
            command: command.to_string(),
            exit_code: None,
            stdout,
            stderr: format!("{stderr}\nwait failed: {e}"),
            timed_out: false,
        },
        Err(_) => {
            warn!(command, ?deadline, "gate command timed out");
            let _ = child.start_kill();
            let _ = child.wait().await;
            CommandOutput {
                command: command.to_string(),
                exit_code: None,
                stdout: String::new(),
                stderr: String::new(),
                timed_out: true,
            }
        }
    }
}

/// Like [`run_with_deadline`] but also feeds `stdin_data` before closing
/// the pipe, for the rare gate command that wants input (unused by the
/// static checks, kept for Gate S's scripted API calls if they shell out).
pub async fn run_with_stdin(
    command: &str,
    workdir: &str,
    deadline: Duration,
    stdin_data: &str,
) -> CommandOutput {
    let mut cmd = Command::new("/bin/sh");
    cmd.arg("-c")
        .arg(command)
        .current_dir(workdir)
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return CommandOutput {
                command: command.to_string(),
                exit_code: None,
                stdout: String::new(),
                stderr: e.to_string(),
                timed_out: false,
            }
        }
    };

    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(stdin_data.as_bytes()).await;
    }

    let mut stdout_pipe = child.stdout.take().expect("piped stdout");
    let mut stderr_pipe = child.stderr.take().expect("piped stderr");
    let run = async {
        let mut stdout = String::new();
        let mut stderr = String::new();
        let (_, _, status) = tokio::join!(
            stdout_pipe.read_to_string(&mut stdout),
            stderr_pipe.read_to_string(&mut stderr),
            child.wait(),
        );
        (stdout, stderr, status)
    };

    match tokio::time::timeout(deadline, run).await {
        Ok((stdout, stderr, Ok(status))) => CommandOutput {
            command: command.to_string(),
            exit_code: status.code(),
            stdout,
            stderr,
            timed_out: false,
        },
        _ => CommandOutput {
            command: command.to_string(),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        },
    }
}
