//! Bridges [`EventSink`] (the orchestrator's observer hook) onto the event
//! bus, and audits every published event except `agent.log`, which is
//! high-volume and would otherwise dominate the audit log.

use std::sync::Arc;

use uuid::Uuid;

use awc_api_types::ServerEvent;
use awc_core::store::Store;
use awc_core::types::AuditEntry;
use awc_orchestrator::orchestrator::{AgentLogLine, EventSink, RunOutcome};
use awc_session::process_pool::StreamSource;

use crate::event_bus::EventBus;

pub struct BusEventSink {
    bus: Arc<EventBus>,
    store: Arc<Store>,
}

impl BusEventSink {
    pub fn new(bus: Arc<EventBus>, store: Arc<Store>) -> Self {
        Self { bus, store }
    }

    fn publish(&self, event: ServerEvent) {
        if let Some(category) = event.audit_category() {
            let store = self.store.clone();
            let entry = AuditEntry::new(
                "bus_event",
                category,
                category,
                "system",
                serde_json::to_value(&event).unwrap_or(serde_json::Value::Null),
            );
            tokio::spawn(async move {
                if let Err(e) = store.record_audit(&entry).await {
                    tracing::warn!(error = %e, "failed to audit bus event");
                }
            });
        }
        self.bus.publish(event);
    }
}

impl EventSink for BusEventSink {
    fn agent_spawned(&self, card_id: Uuid, agent_id: Uuid) {
        self.publish(ServerEvent::AgentSpawned { card_id, agent_id });
    }

    fn agent_log(&self, line: AgentLogLine) {
        let stream = match line.stream {
            StreamSource::Stdout => "stdout",
            StreamSource::Stderr => "stderr",
        };
        self.bus.publish(ServerEvent::AgentLog {
            card_id: line.card_id,
            agent_id: line.agent_id,
            stream: stream.to_string(),
            line: line.line,
        });
    }

    fn agent_completed(&self, card_id: Uuid, outcome: &RunOutcome) {
        self.publish(ServerEvent::AgentCompleted {
            card_id,
            agent_id: outcome.agent_id,
            success: outcome.success,
        });
    }

    fn agent_failed(&self, card_id: Uuid, reason: &str) {
        self.publish(ServerEvent::AgentFailed {
            card_id,
            reason: reason.to_string(),
        });
    }
}
