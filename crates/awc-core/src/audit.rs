use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreError;
use crate::store::Store;
use crate::types::AuditEntry;

impl Store {
    /// Append one entry to the audit log. Callers must not bypass this for
    /// any mutating operation except `agent.log` bus traffic, which is
    /// high-volume and audited at the agent-lifecycle level instead.
    pub async fn record_audit(&self, entry: &AuditEntry) -> Result<(), CoreError> {
        let e = entry.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO audit_log (id, entity_type, entity_id, action, actor, details, timestamp)
                     VALUES (?1,?2,?3,?4,?5,?6,?7)",
                    rusqlite::params![
                        e.id.to_string(),
                        e.entity_type,
                        e.entity_id,
                        e.action,
                        e.actor,
                        e.details.to_string(),
                        e.timestamp.to_rfc3339(),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    /// The audit trail for a single entity, newest first.
    pub async fn audit_for_entity(
        &self,
        entity_type: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Result<Vec<AuditEntry>, CoreError> {
        let entity_type = entity_type.into();
        let entity_id = entity_id.into();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, entity_type, entity_id, action, actor, details, timestamp
                     FROM audit_log WHERE entity_type = ?1 AND entity_id = ?2
                     ORDER BY timestamp DESC",
                )?;
                let mut rows = stmt.query(rusqlite::params![entity_type, entity_id])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_audit_entry(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(CoreError::from)
    }

    /// Recent audit entries across every entity, for the daily digest and
    /// `memory/YYYY-MM-DD.md` rollups.
    pub async fn audit_since(&self, since: DateTime<Utc>) -> Result<Vec<AuditEntry>, CoreError> {
        let since_str = since.to_rfc3339();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, entity_type, entity_id, action, actor, details, timestamp
                     FROM audit_log WHERE timestamp >= ?1 ORDER BY timestamp ASC",
                )?;
                let mut rows = stmt.query(rusqlite::params![since_str])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_audit_entry(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(CoreError::from)
    }
}

fn row_to_audit_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    let id_str: String = row.get(0)?;
    let details_str: String = row.get(5)?;
    let timestamp_str: String = row.get(6)?;

    Ok(AuditEntry {
        id: Uuid::parse_str(&id_str).expect("valid uuid"),
        entity_type: row.get(1)?,
        entity_id: row.get(2)?,
        action: row.get(3)?,
        actor: row.get(4)?,
        details: serde_json::from_str(&details_str).unwrap_or(serde_json::Value::Null),
        timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
            .expect("valid date")
            .with_timezone(&Utc),
    })
}
