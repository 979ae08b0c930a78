use std::os::unix::fs::PermissionsExt;
use std::process::Command;
use std::sync::Arc;

use awc_core::error::CoreError;
use awc_core::store::Store;
use awc_core::types::{KanbanCard, Project};
use awc_core::worktree_manager::WorktreeManager;
use awc_orchestrator::orchestrator::{AcceptAllGates, AgentOrchestrator, NullEventSink};
use awc_queue::WorkQueue;
use awc_session::cli_adapter::AgentKind;
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

fn write_fake_agent(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    let script = dir.join("fake-agent.sh");
    std::fs::write(&script, body).unwrap();
    let mut perms = std::fs::metadata(&script).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&script, perms).unwrap();
    script
}

#[tokio::test]
async fn successful_run_completes_card_and_leaves_a_worktree_diff() {
    let repo = init_repo();
    let script = write_fake_agent(
        repo.path(),
        "#!/bin/sh\ntouch agent-output.txt\necho DONE\n",
    );
    std::env::set_var("AWC_LOCAL_MODEL_BIN", script.to_str().unwrap());

    let store = Arc::new(Store::new_in_memory().await.unwrap());
    let project = Project::new("Demo", "demo project");
    store.create_project(&project).await.unwrap();

    let queue = Arc::new(WorkQueue::new(store.clone()));
    let card = queue
        .create_card(KanbanCard::new(project.id, "ship the feature", "do the work"))
        .await
        .unwrap();
    let card = queue.assign_agent(card.id, "local").await.unwrap();

    let worktrees = Arc::new(WorktreeManager::new(repo.path(), store));
    let pool = Arc::new(ProcessPool::new(4));
    let orchestrator = AgentOrchestrator::new(
        pool,
        worktrees,
        queue,
        Arc::new(NullEventSink),
        Arc::new(AcceptAllGates),
    );

    let outcome = orchestrator
        .spawn_agent(&project, &card, AgentKind::Local, &[])
        .await
        .expect("run should complete");

    assert!(outcome.success, "expected a successful run: {outcome:?}");
    assert_eq!(outcome.exit_code, Some(0));
    assert!(!outcome.timed_out);
    assert!(outcome.log_tail.iter().any(|l| l == "DONE"));
}

#[tokio::test]
async fn concurrency_cap_rejects_when_project_is_full() {
    let store = Arc::new(Store::new_in_memory().await.unwrap());
    let mut project = Project::new("Zero Capacity", "no room for agents");
    project.max_concurrent_agents = Some(0);
    store.create_project(&project).await.unwrap();

    let queue = Arc::new(WorkQueue::new(store.clone()));
    let card = queue
        .create_card(KanbanCard::new(project.id, "stuck", "no capacity"))
        .await
        .unwrap();
    let card = queue.assign_agent(card.id, "local").await.unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let worktrees = Arc::new(WorktreeManager::new(tmp.path(), store));
    let pool = Arc::new(ProcessPool::new(4));
    let orchestrator = AgentOrchestrator::new(
        pool,
        worktrees,
        queue,
        Arc::new(NullEventSink),
        Arc::new(AcceptAllGates),
    );

    let result = orchestrator
        .spawn_agent(&project, &card, AgentKind::Local, &[])
        .await;

    assert!(matches!(result, Err(CoreError::Busy(_))));
}
