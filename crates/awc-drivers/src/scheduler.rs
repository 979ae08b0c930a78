//! The heartbeat ticker — one task serialising Builder -> Synthesizer ->
//! Daily every tick, so consecutive ticks never overlap. Replaces the
//! independently-ticking patrol/heartbeat/kpi loops this crate inherited.

use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{info, warn};

use awc_core::checklist::ChecklistOverlay;
use awc_core::config::Config;
use awc_harness::shutdown::ShutdownSignal;

use crate::builder::Builder;
use crate::daily::Daily;
use crate::synthesizer::Synthesizer;

/// Default interval between heartbeat ticks (spec baseline: 60s).
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Owns the three drivers and the single ticker that serialises them.
/// `HEARTBEAT.md` is re-parsed at the start of every tick, never mid-tick.
pub struct HeartbeatScheduler {
    config: Config,
    checklist_path: PathBuf,
    builder: Builder,
    synthesizer: Synthesizer,
    daily: Daily,
    shutdown: ShutdownSignal,
    last_daily_run: Option<NaiveDate>,
    last_digest_at: DateTime<Utc>,
}

impl HeartbeatScheduler {
    pub fn new(
        config: Config,
        checklist_path: PathBuf,
        builder: Builder,
        synthesizer: Synthesizer,
        daily: Daily,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            config,
            checklist_path,
            builder,
            synthesizer,
            daily,
            shutdown,
            last_daily_run: None,
            last_digest_at: Utc::now(),
        }
    }

    /// Runs ticks until shutdown is triggered.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(TICK_INTERVAL);
        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick().await;
                }
                _ = shutdown_rx.recv() => {
                    info!("shutdown signal received, stopping heartbeat scheduler");
                    break;
                }
            }
        }
    }

    async fn tick(&mut self) {
        let mut config = self.config.clone();
        ChecklistOverlay::load(&self.checklist_path).apply_to(&mut config);

        match self.builder.run(&config.toggles, &config.constraints).await {
            Ok(report) => info!(
                scanned = report.projects_scanned,
                dispatched = report.cards_dispatched,
                skipped = report.cards_skipped_gate0,
                "builder subphase complete"
            ),
            Err(e) => warn!(error = %e, "builder subphase failed"),
        }

        let gate_deadline = Duration::from_secs(config.gates.per_command_secs);
        match self.synthesizer.run(&config.toggles, gate_deadline).await {
            Ok(report) => info!(
                attempts = report.merge_attempts,
                merged = report.merged,
                conflicts = report.conflicts,
                gate2_failures = report.gate2_failures,
                "synthesizer subphase complete"
            ),
            Err(e) => warn!(error = %e, "synthesizer subphase failed"),
        }

        if self.should_run_daily() {
            match self
                .daily
                .run(&config.toggles, &config.constraints, self.last_digest_at)
                .await
            {
                Ok(report) => {
                    info!(
                        worktrees_cleaned = report.worktrees_cleaned,
                        cards_retried = report.cards_retried,
                        prs_drafted = report.prs_drafted,
                        digest_entries = report.digest_entries,
                        "daily subphase complete"
                    );
                    self.last_digest_at = Utc::now();
                    self.last_daily_run = Some(Utc::now().date_naive());
                }
                Err(e) => warn!(error = %e, "daily subphase failed"),
            }
        }
    }

    fn should_run_daily(&self) -> bool {
        self.last_daily_run != Some(Utc::now().date_naive())
    }
}
