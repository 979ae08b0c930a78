use std::process::Command;
use std::sync::Arc;

use awc_core::config::Config;
use awc_core::store::Store;
use awc_core::types::{KanbanCard, Project};
use awc_core::worktree_manager::WorktreeManager;
use awc_drivers::{Builder, Daily, HeartbeatScheduler, NoOpDraftPrPreparer, Synthesizer};
use awc_gates::gate1::StaticCheckCommands;
use awc_harness::shutdown::ShutdownSignal;
use awc_orchestrator::orchestrator::{AcceptAllGates, AgentOrchestrator, NullEventSink};
use awc_queue::WorkQueue;
use awc_session::process_pool::ProcessPool;

fn git(dir: &std::path::Path, args: &[&str]) {
    let status = Command::new("git")
        .args(args)
        .current_dir(dir)
        .status()
        .expect("git must be on PATH for this test");
    assert!(status.success(), "git {args:?} failed");
}

fn init_repo() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    git(dir.path(), &["init", "-q", "-b", "main"]);
    git(dir.path(), &["config", "user.email", "test@example.com"]);
    git(dir.path(), &["config", "user.name", "test"]);
    std::fs::write(dir.path().join("README.md"), "hello\n").unwrap();
    git(dir.path(), &["add", "."]);
    git(dir.path(), &["commit", "-q", "-m", "initial"]);
    dir
}

/// A single scheduler tick fires immediately when the loop starts (tokio's
/// interval completes its first tick without delay), so this drives the
/// builder/synthesizer/daily sequence once end-to-end and then shuts down.
#[tokio::test]
async fn a_single_tick_runs_builder_then_synthesizer_then_daily() {
    let repo = init_repo();
    let store = Arc::new(Store::new_in_memory().await.unwrap());
    let project = Project::new("Demo", "demo project");
    store.create_project(&project).await.unwrap();

    let queue = Arc::new(WorkQueue::new(store.clone()));
    let card = queue
        .create_card(KanbanCard::new(project.id, "ship the feature", "do the work"))
        .await
        .unwrap();

    let worktrees = Arc::new(WorktreeManager::new(repo.path(), store.clone()));
    let pool = Arc::new(ProcessPool::new(4));
    let orchestrator = Arc::new(AgentOrchestrator::new(
        pool,
        worktrees.clone(),
        queue.clone(),
        Arc::new(NullEventSink),
        Arc::new(AcceptAllGates),
    ));

    let commands = StaticCheckCommands {
        typecheck: "true".to_string(),
        lint: "true".to_string(),
        test: "true".to_string(),
    };

    let builder = Builder::new(store.clone(), queue.clone(), worktrees.clone(), orchestrator);
    let synthesizer = Synthesizer::new(store.clone(), queue.clone(), worktrees.clone(), commands);
    let daily = Daily::new(store.clone(), queue.clone(), worktrees.clone(), Arc::new(NoOpDraftPrPreparer));

    let data_dir = tempfile::tempdir().unwrap();
    let config = Config::for_smoke_test(data_dir.path().to_path_buf(), 0);
    let checklist_path = data_dir.path().join("HEARTBEAT.md");

    let shutdown = ShutdownSignal::new();
    let scheduler = HeartbeatScheduler::new(
        config,
        checklist_path,
        builder,
        synthesizer,
        daily,
        shutdown.clone(),
    );

    let handle = tokio::spawn(scheduler.run());

    // Let the first (immediate) tick complete, then stop the scheduler.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    shutdown.trigger();
    tokio::time::timeout(std::time::Duration::from_secs(5), handle)
        .await
        .expect("scheduler should stop promptly after shutdown")
        .expect("scheduler task should not panic");

    let cards = store.list_cards_by_project(project.id).await.unwrap();
    let dispatched = cards.into_iter().find(|c| c.id == card.id).unwrap();
    assert!(
        dispatched.assigned_agent.is_some(),
        "builder subphase should have claimed the card on the first tick"
    );
}
