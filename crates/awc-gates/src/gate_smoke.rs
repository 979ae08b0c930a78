//! Gate S — behavioural smoke test. Builds the project, starts the server
//! on a free port with an isolated data directory, waits for its health
//! endpoint, exercises a fixed script of API calls, then tears the server
//! down.

use std::net::TcpListener;
use std::process::Stdio;
use std::time::{Duration, Instant};

use reqwest::{Client, Method};
use tokio::process::{Child, Command};
use tracing::warn;

use crate::runner::run_with_deadline;
use crate::types::CommandOutput;

/// How long Gate S waits for the health endpoint before giving up.
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(30);

/// Grace period before escalating teardown to a forceful kill.
pub const TEARDOWN_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct ScriptedCall {
    pub method: Method,
    pub path: String,
    pub body: Option<String>,
    pub expected_status: u16,
}

/// The fixed script a project configures for its behavioural smoke test.
/// `start_command` is invoked with `PORT` and `DATA_DIR` set in its
/// environment and is expected to bind to `PORT` on localhost.
#[derive(Debug, Clone)]
pub struct SmokeScript {
    pub build_command: String,
    pub start_command: String,
    pub health_path: String,
    pub calls: Vec<ScriptedCall>,
}

#[derive(Debug, Clone)]
pub struct ScriptedCallResult {
    pub path: String,
    pub expected_status: u16,
    pub actual_status: Option<u16>,
    pub passed: bool,
}

#[derive(Debug, Clone)]
pub struct GateSResult {
    pub passed: bool,
    pub build: CommandOutput,
    pub health_check_ready: bool,
    pub calls: Vec<ScriptedCallResult>,
}

/// Binds an ephemeral port and immediately releases it — cheap, racy in
/// theory, good enough for a single-host local smoke test.
pub fn free_port() -> std::io::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

pub async fn run_gate_smoke(
    workdir: &str,
    data_dir: &str,
    script: &SmokeScript,
    build_deadline: Duration,
    health_check_timeout: Duration,
) -> GateSResult {
    let build = run_with_deadline(&script.build_command, workdir, build_deadline, &[]).await;
    if !build.passed() {
        return GateSResult {
            passed: false,
            build,
            health_check_ready: false,
            calls: Vec::new(),
        };
    }

    let port = match free_port() {
        Ok(port) => port,
        Err(e) => {
            warn!(error = %e, "could not reserve a free port for Gate S");
            return GateSResult {
                passed: false,
                build,
                health_check_ready: false,
                calls: Vec::new(),
            };
        }
    };

    let mut child = match Command::new("/bin/sh")
        .arg("-c")
        .arg(&script.start_command)
        .current_dir(workdir)
        .env_clear()
        .env("PATH", std::env::var("PATH").unwrap_or_default())
        .env("PORT", port.to_string())
        .env("DATA_DIR", data_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            warn!(error = %e, "failed to start the smoke-test server");
            return GateSResult {
                passed: false,
                build,
                health_check_ready: false,
                calls: Vec::new(),
            };
        }
    };

    let base_url = format!("http://127.0.0.1:{port}");
    let client = Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap_or_default();

    let health_check_ready =
        wait_for_health(&client, &format!("{base_url}{}", script.health_path), health_check_timeout).await;

    let mut calls = Vec::new();
    if health_check_ready {
        for call in &script.calls {
            calls.push(run_scripted_call(&client, &base_url, call).await);
        }
    }

    teardown(&mut child, TEARDOWN_GRACE).await;

    let passed = health_check_ready && calls.iter().all(|c| c.passed);
    GateSResult {
        passed,
        build,
        health_check_ready,
        calls,
    }
}

async fn wait_for_health(client: &Client, url: &str, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if let Ok(response) = client.get(url).send().await {
            if response.status().is_success() {
                return true;
            }
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}

async fn run_scripted_call(client: &Client, base_url: &str, call: &ScriptedCall) -> ScriptedCallResult {
    let url = format!("{base_url}{}", call.path);
    let mut request = client.request(call.method.clone(), &url);
    if let Some(body) = &call.body {
        request = request.body(body.clone());
    }

    match request.send().await {
        Ok(response) => {
            let actual = response.status().as_u16();
            ScriptedCallResult {
                path: call.path.clone(),
                expected_status: call.expected_status,
                actual_status: Some(actual),
                passed: actual == call.expected_status,
            }
        }
        Err(_) => ScriptedCallResult {
            path: call.path.clone(),
            expected_status: call.expected_status,
            actual_status: None,
            passed: false,
        },
    }
}

/// Waits up to `grace` for the server to exit on its own, then escalates
/// to a forceful kill.
async fn teardown(child: &mut Child, grace: Duration) {
    if tokio::time::timeout(grace, child.wait()).await.is_ok() {
        return;
    }
    warn!(?grace, "smoke-test server did not exit in time, killing it");
    let _ = child.start_kill();
    let _ = child.wait().await;
}
