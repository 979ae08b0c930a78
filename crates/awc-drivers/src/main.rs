//! The heartbeat daemon binary: wires persistence, the work queue, the
//! worktree manager, the agent orchestrator, and the gate pipeline
//! together, then runs the heartbeat scheduler until shutdown.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use awc_bus::event_bus::EventBus;
use awc_bus::sink::BusEventSink;
use awc_bus::{build_router, ApiState};
use awc_core::config::Config;
use awc_core::store::Store;
use awc_core::worktree_manager::WorktreeManager;
use awc_drivers::{
    Builder, Daily, DraftPrPreparer, GitHubDraftPrPreparer, HeartbeatScheduler, NoOpDraftPrPreparer,
    Synthesizer,
};
use awc_gates::gate1::StaticCheckCommands;
use awc_harness::shutdown::ShutdownSignal;
use awc_integrations::github::client::GitHubClient;
use awc_orchestrator::orchestrator::{AgentOrchestrator, GateRunner};
use awc_queue::WorkQueue;
use awc_session::process_pool::ProcessPool;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Bridges the orchestrator's post-run gate hook to the real static-check
/// gate pipeline, replacing the `AcceptAllGates` stub used in tests.
struct StaticGateRunner {
    commands: StaticCheckCommands,
    deadline: std::time::Duration,
}

#[async_trait::async_trait]
impl GateRunner for StaticGateRunner {
    async fn run_gate_one(&self, card_id: uuid::Uuid, workdir: &str) -> awc_gates::VerificationResult {
        awc_gates::run_static_checks(
            card_id,
            awc_gates::Gate::Branch,
            workdir,
            workdir,
            &self.commands,
            self.deadline,
        )
        .await
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    awc_telemetry::logging::init_logging("awc-daemon", "info");

    let config = Config::from_env().context("failed to load configuration")?;
    std::fs::create_dir_all(&config.data_dir).context("failed to create data directory")?;

    let db_path = config.data_dir.join("awc.sqlite3");
    let store = Arc::new(Store::new(&db_path).await.context("failed to open store")?);

    let queue = Arc::new(WorkQueue::new(store.clone()));
    let worktrees = Arc::new(WorktreeManager::new(config.data_dir.clone(), store.clone()));
    let pool = Arc::new(ProcessPool::new(config.constraints.max_concurrent_agents as usize));

    let static_commands = StaticCheckCommands {
        typecheck: std::env::var("AWC_TYPECHECK_CMD").unwrap_or_else(|_| "true".into()),
        lint: std::env::var("AWC_LINT_CMD").unwrap_or_else(|_| "true".into()),
        test: std::env::var("AWC_TEST_CMD").unwrap_or_else(|_| "true".into()),
    };
    let gate_deadline = std::time::Duration::from_secs(config.gates.per_command_secs);
    let gates: Arc<dyn GateRunner> = Arc::new(StaticGateRunner {
        commands: static_commands.clone(),
        deadline: gate_deadline,
    });

    let bus = Arc::new(EventBus::new());
    let sink = Arc::new(BusEventSink::new(bus.clone(), store.clone()));

    let orchestrator = Arc::new(AgentOrchestrator::new(pool, worktrees.clone(), queue.clone(), sink, gates));

    let builder = Builder::new(store.clone(), queue.clone(), worktrees.clone(), orchestrator);
    let synthesizer = Synthesizer::new(store.clone(), queue.clone(), worktrees.clone(), static_commands);
    let draft_pr: Arc<dyn DraftPrPreparer> = match GitHubClient::new_from_env() {
        Ok(client) => {
            let base_branch = std::env::var("AWC_GITHUB_BASE_BRANCH").unwrap_or_else(|_| "main".into());
            Arc::new(GitHubDraftPrPreparer::new(client, base_branch))
        }
        Err(e) => {
            tracing::debug!(error = %e, "no GitHub credentials configured, draft PRs disabled");
            Arc::new(NoOpDraftPrPreparer)
        }
    };
    let daily = Daily::new(store.clone(), queue.clone(), worktrees.clone(), draft_pr);

    let shutdown = ShutdownSignal::new();
    let checklist_path = config.data_dir.join("HEARTBEAT.md");
    let ping_secs = config.gates.ping_secs;
    let bearer_token = config.bearer_token.clone();
    let port = config.port;
    let scheduler = HeartbeatScheduler::new(config, checklist_path, builder, synthesizer, daily, shutdown.clone());

    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("ctrl-c received, initiating shutdown");
                shutdown.trigger();
            }
        }
    });

    let api_state = ApiState::new(store, queue, bus, bearer_token, ping_secs);
    let router = build_router(api_state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .context("failed to bind API listener")?;
    let mut bus_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        info!(%port, "event bus and API listening");
        let serve = axum::serve(listener, router);
        tokio::select! {
            result = serve => {
                if let Err(e) = result {
                    tracing::error!(error = %e, "bus server exited with an error");
                }
            }
            _ = bus_shutdown.recv() => {
                info!("bus server shutting down");
            }
        }
    });

    info!("heartbeat daemon starting");
    scheduler.run().await;
    info!("heartbeat daemon stopped");
    Ok(())
}
