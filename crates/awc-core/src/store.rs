use std::path::Path;

use chrono::{DateTime, Utc};
use tokio_rusqlite::Connection;
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{
    AgentStatus, Campaign, Column, Conversation, ConversationStatus, CorrectionDomain,
    CorrectionSource, Decision, DocumentType, KanbanCard, Message, MessageRole, Project,
    ProjectDocument, ProjectStatus, SteeringCorrection, VerificationStatus,
};

/// Async SQLite-backed store for every persisted entity in the system.
///
/// Opened once per process, WAL-mode, busy-timeout tuned for a handful of
/// concurrent logical tasks writing against one file. Readers are never
/// serialised; writers serialise at SQLite's own lock boundary.
pub struct Store {
    pub(crate) conn: Connection,
}

// ---------------------------------------------------------------------------
// helpers — enum <-> SQLite string, timestamp <-> rfc3339
// ---------------------------------------------------------------------------

fn enum_to_sql<T: serde::Serialize>(val: &T) -> String {
    let s = serde_json::to_string(val).expect("serialize enum");
    s.trim_matches('"').to_string()
}

fn enum_from_sql<T: serde::de::DeserializeOwned>(raw: &str) -> T {
    let quoted = format!("\"{}\"", raw);
    serde_json::from_str(&quoted).expect("deserialize enum")
}

fn ts_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

fn ts_from_sql(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .expect("valid date")
        .with_timezone(&Utc)
}

fn opt_ts_to_sql(ts: &Option<DateTime<Utc>>) -> Option<String> {
    ts.as_ref().map(ts_to_sql)
}

fn opt_ts_from_sql(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.map(|s| ts_from_sql(&s))
}

fn json_to_sql<T: serde::Serialize>(val: &T) -> String {
    serde_json::to_string(val).expect("serialize json")
}

fn json_from_sql<T: serde::de::DeserializeOwned + Default>(raw: &str) -> T {
    if raw.is_empty() {
        return T::default();
    }
    serde_json::from_str(raw).unwrap_or_default()
}

impl Store {
    /// Open (or create) a database at the given file path.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let conn = Connection::open(path.as_ref()).await?;
        let db = Self { conn };
        db.init_schema().await?;
        Ok(db)
    }

    /// Create a purely in-memory database — used by tests and by the Gate
    /// Pipeline's behavioural-smoke harness, never by the user's real data.
    pub async fn new_in_memory() -> Result<Self, CoreError> {
        let conn = Connection::open_in_memory().await?;
        let db = Self { conn };
        db.init_schema().await?;
        Ok(db)
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    async fn init_schema(&self) -> Result<(), CoreError> {
        self.conn
            .call(|conn| {
                conn.execute_batch(
                    "
                    PRAGMA journal_mode=WAL;
                    PRAGMA synchronous=NORMAL;
                    PRAGMA cache_size=-64000;
                    PRAGMA mmap_size=268435456;
                    PRAGMA temp_store=MEMORY;
                    PRAGMA busy_timeout=5000;
                    PRAGMA foreign_keys=ON;

                    CREATE TABLE IF NOT EXISTS projects (
                        id                    TEXT PRIMARY KEY,
                        name                  TEXT NOT NULL,
                        description           TEXT NOT NULL,
                        status                TEXT NOT NULL,
                        color                 TEXT,
                        agent_timeout_minutes INTEGER,
                        max_concurrent_agents INTEGER,
                        created_at            TEXT NOT NULL,
                        updated_at            TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS project_documents (
                        id          TEXT PRIMARY KEY,
                        project_id  TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                        doc_type    TEXT NOT NULL,
                        title       TEXT NOT NULL,
                        content     TEXT NOT NULL,
                        created_at  TEXT NOT NULL,
                        updated_at  TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_documents_project ON project_documents(project_id);
                    CREATE UNIQUE INDEX IF NOT EXISTS idx_documents_singleton
                        ON project_documents(project_id, doc_type)
                        WHERE doc_type IN ('assumptions', 'state');

                    CREATE TABLE IF NOT EXISTS kanban_cards (
                        id                  TEXT PRIMARY KEY,
                        project_id          TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                        title               TEXT NOT NULL,
                        description         TEXT NOT NULL,
                        column_name         TEXT NOT NULL,
                        labels              TEXT NOT NULL DEFAULT '[]',
                        due_date            TEXT,
                        linked_decision_ids TEXT NOT NULL DEFAULT '[]',
                        linked_message_ids  TEXT NOT NULL DEFAULT '[]',
                        position            INTEGER NOT NULL DEFAULT 0,
                        priority            INTEGER NOT NULL DEFAULT 0,
                        context_snapshot    TEXT,
                        last_session_id     TEXT,
                        assigned_agent      TEXT,
                        agent_status        TEXT,
                        blocked_reason      TEXT,
                        started_at          TEXT,
                        completed_at        TEXT,
                        verification_status TEXT,
                        campaign_id         TEXT,
                        created_at          TEXT NOT NULL,
                        updated_at          TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_cards_project_column
                        ON kanban_cards(project_id, column_name);
                    CREATE INDEX IF NOT EXISTS idx_cards_campaign ON kanban_cards(campaign_id);

                    CREATE TABLE IF NOT EXISTS decisions (
                        id           TEXT PRIMARY KEY,
                        project_id   TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                        title        TEXT NOT NULL,
                        description  TEXT NOT NULL,
                        alternatives TEXT NOT NULL DEFAULT '[]',
                        reasoning    TEXT NOT NULL,
                        tradeoffs    TEXT NOT NULL,
                        created_at   TEXT NOT NULL,
                        revised_at   TEXT
                    );

                    CREATE INDEX IF NOT EXISTS idx_decisions_project ON decisions(project_id);

                    CREATE TABLE IF NOT EXISTS steering_corrections (
                        id         TEXT PRIMARY KEY,
                        correction TEXT NOT NULL,
                        domain     TEXT NOT NULL,
                        source     TEXT NOT NULL,
                        context    TEXT,
                        project_id TEXT,
                        active     INTEGER NOT NULL DEFAULT 1,
                        created_at TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_corrections_project ON steering_corrections(project_id);

                    CREATE TABLE IF NOT EXISTS conversations (
                        id                  TEXT PRIMARY KEY,
                        session_id          TEXT NOT NULL,
                        project_id          TEXT,
                        status              TEXT NOT NULL,
                        context_usage_tokens INTEGER NOT NULL DEFAULT 0,
                        summary             TEXT,
                        created_at          TEXT NOT NULL,
                        updated_at          TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS messages (
                        id              TEXT PRIMARY KEY,
                        conversation_id TEXT,
                        project_id      TEXT,
                        role            TEXT NOT NULL,
                        content         TEXT NOT NULL,
                        metadata        TEXT,
                        created_at      TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_messages_conversation ON messages(conversation_id);

                    CREATE TABLE IF NOT EXISTS campaigns (
                        id          TEXT PRIMARY KEY,
                        project_id  TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                        name        TEXT NOT NULL,
                        baseline    TEXT NOT NULL,
                        created_at  TEXT NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS audit_log (
                        id          TEXT PRIMARY KEY,
                        entity_type TEXT NOT NULL,
                        entity_id   TEXT NOT NULL,
                        action      TEXT NOT NULL,
                        actor       TEXT NOT NULL,
                        details     TEXT NOT NULL,
                        timestamp   TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_type, entity_id);

                    CREATE TABLE IF NOT EXISTS token_usage (
                        id            TEXT PRIMARY KEY,
                        project_id    TEXT,
                        session_id    TEXT,
                        input_tokens  INTEGER NOT NULL,
                        output_tokens INTEGER NOT NULL,
                        created_at    TEXT NOT NULL
                    );

                    CREATE INDEX IF NOT EXISTS idx_usage_project ON token_usage(project_id);

                    -- Full-text search indices, kept in sync via triggers below.
                    CREATE VIRTUAL TABLE IF NOT EXISTS kanban_cards_fts USING fts5(
                        title, description, content='kanban_cards', content_rowid='rowid'
                    );
                    CREATE VIRTUAL TABLE IF NOT EXISTS project_documents_fts USING fts5(
                        title, content, content='project_documents', content_rowid='rowid'
                    );
                    CREATE VIRTUAL TABLE IF NOT EXISTS decisions_fts USING fts5(
                        title, description, reasoning, tradeoffs,
                        content='decisions', content_rowid='rowid'
                    );

                    CREATE TRIGGER IF NOT EXISTS kanban_cards_ai AFTER INSERT ON kanban_cards BEGIN
                        INSERT INTO kanban_cards_fts(rowid, title, description)
                        VALUES (new.rowid, new.title, new.description);
                    END;
                    CREATE TRIGGER IF NOT EXISTS kanban_cards_ad AFTER DELETE ON kanban_cards BEGIN
                        INSERT INTO kanban_cards_fts(kanban_cards_fts, rowid, title, description)
                        VALUES ('delete', old.rowid, old.title, old.description);
                    END;
                    CREATE TRIGGER IF NOT EXISTS kanban_cards_au AFTER UPDATE ON kanban_cards BEGIN
                        INSERT INTO kanban_cards_fts(kanban_cards_fts, rowid, title, description)
                        VALUES ('delete', old.rowid, old.title, old.description);
                        INSERT INTO kanban_cards_fts(rowid, title, description)
                        VALUES (new.rowid, new.title, new.description);
                    END;

                    CREATE TRIGGER IF NOT EXISTS project_documents_ai AFTER INSERT ON project_documents BEGIN
                        INSERT INTO project_documents_fts(rowid, title, content)
                        VALUES (new.rowid, new.title, new.content);
                    END;
                    CREATE TRIGGER IF NOT EXISTS project_documents_ad AFTER DELETE ON project_documents BEGIN
                        INSERT INTO project_documents_fts(project_documents_fts, rowid, title, content)
                        VALUES ('delete', old.rowid, old.title, old.content);
                    END;
                    CREATE TRIGGER IF NOT EXISTS project_documents_au AFTER UPDATE ON project_documents BEGIN
                        INSERT INTO project_documents_fts(project_documents_fts, rowid, title, content)
                        VALUES ('delete', old.rowid, old.title, old.content);
                        INSERT INTO project_documents_fts(rowid, title, content)
                        VALUES (new.rowid, new.title, new.content);
                    END;

                    CREATE TRIGGER IF NOT EXISTS decisions_ai AFTER INSERT ON decisions BEGIN
                        INSERT INTO decisions_fts(rowid, title, description, reasoning, tradeoffs)
                        VALUES (new.rowid, new.title, new.description, new.reasoning, new.tradeoffs);
                    END;
                    CREATE TRIGGER IF NOT EXISTS decisions_ad AFTER DELETE ON decisions BEGIN
                        INSERT INTO decisions_fts(decisions_fts, rowid, title, description, reasoning, tradeoffs)
                        VALUES ('delete', old.rowid, old.title, old.description, old.reasoning, old.tradeoffs);
                    END;
                    CREATE TRIGGER IF NOT EXISTS decisions_au AFTER UPDATE ON decisions BEGIN
                        INSERT INTO decisions_fts(decisions_fts, rowid, title, description, reasoning, tradeoffs)
                        VALUES ('delete', old.rowid, old.title, old.description, old.reasoning, old.tradeoffs);
                        INSERT INTO decisions_fts(rowid, title, description, reasoning, tradeoffs)
                        VALUES (new.rowid, new.title, new.description, new.reasoning, new.tradeoffs);
                    END;
                    ",
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    // -----------------------------------------------------------------------
    // Project CRUD
    // -----------------------------------------------------------------------

    pub async fn create_project(&self, project: &Project) -> Result<(), CoreError> {
        let p = project.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO projects (id, name, description, status, color,
                        agent_timeout_minutes, max_concurrent_agents, created_at, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
                    rusqlite::params![
                        p.id.to_string(),
                        p.name,
                        p.description,
                        enum_to_sql(&p.status),
                        p.color,
                        p.agent_timeout_minutes,
                        p.max_concurrent_agents,
                        ts_to_sql(&p.created_at),
                        ts_to_sql(&p.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn get_project(&self, id: Uuid) -> Result<Option<Project>, CoreError> {
        let id_str = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, description, status, color, agent_timeout_minutes,
                            max_concurrent_agents, created_at, updated_at
                     FROM projects WHERE id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![id_str])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_project(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn list_projects(&self) -> Result<Vec<Project>, CoreError> {
        self.conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, name, description, status, color, agent_timeout_minutes,
                            max_concurrent_agents, created_at, updated_at
                     FROM projects ORDER BY created_at ASC",
                )?;
                let mut rows = stmt.query([])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_project(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn update_project(&self, project: &Project) -> Result<(), CoreError> {
        let mut p = project.clone();
        p.updated_at = Utc::now();
        self.conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE projects SET name=?2, description=?3, status=?4, color=?5,
                        agent_timeout_minutes=?6, max_concurrent_agents=?7, updated_at=?8
                     WHERE id=?1",
                    rusqlite::params![
                        p.id.to_string(),
                        p.name,
                        p.description,
                        enum_to_sql(&p.status),
                        p.color,
                        p.agent_timeout_minutes,
                        p.max_concurrent_agents,
                        ts_to_sql(&p.updated_at),
                    ],
                )?;
                Ok(changed)
            })
            .await
            .map_err(CoreError::from)
            .and_then(|n| {
                if n == 0 {
                    Err(CoreError::NotFound(format!("project {}", project.id)))
                } else {
                    Ok(())
                }
            })
    }

    // -----------------------------------------------------------------------
    // ProjectDocument CRUD
    // -----------------------------------------------------------------------

    pub async fn upsert_document(&self, doc: &ProjectDocument) -> Result<(), CoreError> {
        if doc.doc_type.is_singleton() {
            if let Some(existing) = self
                .get_document_by_type(doc.project_id, doc.doc_type)
                .await?
            {
                if existing.id != doc.id {
                    return Err(CoreError::Conflict {
                        message: format!(
                            "project {} already has a {:?} document",
                            doc.project_id, doc.doc_type
                        ),
                        current_updated_at: Some(existing.updated_at),
                    });
                }
            }
        }

        let d = doc.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO project_documents (id, project_id, doc_type, title, content, created_at, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7)
                     ON CONFLICT(id) DO UPDATE SET
                        title=excluded.title, content=excluded.content, updated_at=excluded.updated_at",
                    rusqlite::params![
                        d.id.to_string(),
                        d.project_id.to_string(),
                        enum_to_sql(&d.doc_type),
                        d.title,
                        d.content,
                        ts_to_sql(&d.created_at),
                        ts_to_sql(&Utc::now()),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn get_document_by_type(
        &self,
        project_id: Uuid,
        doc_type: DocumentType,
    ) -> Result<Option<ProjectDocument>, CoreError> {
        let project_id_str = project_id.to_string();
        let doc_type_str = enum_to_sql(&doc_type);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project_id, doc_type, title, content, created_at, updated_at
                     FROM project_documents WHERE project_id = ?1 AND doc_type = ?2",
                )?;
                let mut rows = stmt.query(rusqlite::params![project_id_str, doc_type_str])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_document(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn list_documents(&self, project_id: Uuid) -> Result<Vec<ProjectDocument>, CoreError> {
        let project_id_str = project_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project_id, doc_type, title, content, created_at, updated_at
                     FROM project_documents WHERE project_id = ?1 ORDER BY created_at ASC",
                )?;
                let mut rows = stmt.query(rusqlite::params![project_id_str])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_document(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(CoreError::from)
    }

    // -----------------------------------------------------------------------
    // KanbanCard CRUD
    // -----------------------------------------------------------------------

    pub async fn create_card(&self, card: &KanbanCard) -> Result<(), CoreError> {
        let c = card.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO kanban_cards (
                        id, project_id, title, description, column_name, labels, due_date,
                        linked_decision_ids, linked_message_ids, position, priority,
                        context_snapshot, last_session_id, assigned_agent, agent_status,
                        blocked_reason, started_at, completed_at, verification_status,
                        campaign_id, created_at, updated_at
                     ) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11,?12,?13,?14,?15,?16,?17,?18,?19,?20,?21,?22)",
                    rusqlite::params![
                        c.id.to_string(),
                        c.project_id.to_string(),
                        c.title,
                        c.description,
                        enum_to_sql(&c.column),
                        json_to_sql(&c.labels),
                        opt_ts_to_sql(&c.due_date),
                        json_to_sql(&c.linked_decision_ids),
                        json_to_sql(&c.linked_message_ids),
                        c.position,
                        c.priority,
                        c.context_snapshot,
                        c.last_session_id.map(|u| u.to_string()),
                        c.assigned_agent,
                        c.agent_status.as_ref().map(enum_to_sql),
                        c.blocked_reason,
                        opt_ts_to_sql(&c.started_at),
                        opt_ts_to_sql(&c.completed_at),
                        c.verification_status.as_ref().map(enum_to_sql),
                        c.campaign_id.map(|u| u.to_string()),
                        ts_to_sql(&c.created_at),
                        ts_to_sql(&c.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn get_card(&self, id: Uuid) -> Result<Option<KanbanCard>, CoreError> {
        let id_str = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&card_select_sql("WHERE id = ?1"))?;
                let mut rows = stmt.query(rusqlite::params![id_str])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_card(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn list_cards_by_column(
        &self,
        project_id: Uuid,
        column: Column,
    ) -> Result<Vec<KanbanCard>, CoreError> {
        let project_id_str = project_id.to_string();
        let column_str = enum_to_sql(&column);
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&card_select_sql(
                    "WHERE project_id = ?1 AND column_name = ?2 ORDER BY position ASC, created_at ASC",
                ))?;
                let mut rows = stmt.query(rusqlite::params![project_id_str, column_str])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_card(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(CoreError::from)
    }

    /// All cards for a project, across every column — the raw material for
    /// `getBoard`.
    pub async fn list_cards_by_project(&self, project_id: Uuid) -> Result<Vec<KanbanCard>, CoreError> {
        let project_id_str = project_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&card_select_sql(
                    "WHERE project_id = ?1 ORDER BY column_name ASC, position ASC",
                ))?;
                let mut rows = stmt.query(rusqlite::params![project_id_str])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_card(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(CoreError::from)
    }

    /// Replace a card in place. If `if_updated_at` is supplied, the write is
    /// rejected with `Conflict` unless it matches the row's current
    /// `updated_at` — the optimistic-locking contract of §4.1.
    pub async fn update_card(
        &self,
        card: &KanbanCard,
        if_updated_at: Option<DateTime<Utc>>,
    ) -> Result<KanbanCard, CoreError> {
        let id_str = card.id.to_string();
        let current = self
            .get_card(card.id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("card {}", card.id)))?;

        if let Some(expected) = if_updated_at {
            if current.updated_at != expected {
                return Err(CoreError::conflict(
                    format!("card {} was updated concurrently", card.id),
                    current.updated_at,
                ));
            }
        }

        let mut c = card.clone();
        c.updated_at = Utc::now();
        let updated_at_sql = ts_to_sql(&c.updated_at);

        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE kanban_cards SET
                        title=?2, description=?3, column_name=?4, labels=?5, due_date=?6,
                        linked_decision_ids=?7, linked_message_ids=?8, position=?9, priority=?10,
                        context_snapshot=?11, last_session_id=?12, assigned_agent=?13,
                        agent_status=?14, blocked_reason=?15, started_at=?16, completed_at=?17,
                        verification_status=?18, campaign_id=?19, updated_at=?20
                     WHERE id=?1",
                    rusqlite::params![
                        id_str,
                        c.title,
                        c.description,
                        enum_to_sql(&c.column),
                        json_to_sql(&c.labels),
                        opt_ts_to_sql(&c.due_date),
                        json_to_sql(&c.linked_decision_ids),
                        json_to_sql(&c.linked_message_ids),
                        c.position,
                        c.priority,
                        c.context_snapshot,
                        c.last_session_id.map(|u| u.to_string()),
                        c.assigned_agent,
                        c.agent_status.as_ref().map(enum_to_sql),
                        c.blocked_reason,
                        opt_ts_to_sql(&c.started_at),
                        opt_ts_to_sql(&c.completed_at),
                        c.verification_status.as_ref().map(enum_to_sql),
                        c.campaign_id.map(|u| u.to_string()),
                        updated_at_sql,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)?;

        Ok(c)
    }

    pub async fn delete_card(&self, id: Uuid) -> Result<(), CoreError> {
        let id_str = id.to_string();
        let changed = self
            .conn
            .call(move |conn| Ok(conn.execute("DELETE FROM kanban_cards WHERE id = ?1", rusqlite::params![id_str])?))
            .await
            .map_err(CoreError::from)?;

        if changed == 0 {
            Err(CoreError::NotFound(format!("card {id}")))
        } else {
            Ok(())
        }
    }

    // -----------------------------------------------------------------------
    // Decision CRUD
    // -----------------------------------------------------------------------

    pub async fn create_decision(&self, decision: &Decision) -> Result<(), CoreError> {
        let d = decision.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO decisions (id, project_id, title, description, alternatives,
                        reasoning, tradeoffs, created_at, revised_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
                    rusqlite::params![
                        d.id.to_string(),
                        d.project_id.to_string(),
                        d.title,
                        d.description,
                        json_to_sql(&d.alternatives),
                        d.reasoning,
                        d.tradeoffs,
                        ts_to_sql(&d.created_at),
                        opt_ts_to_sql(&d.revised_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn list_decisions(&self, project_id: Uuid) -> Result<Vec<Decision>, CoreError> {
        let project_id_str = project_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project_id, title, description, alternatives, reasoning,
                            tradeoffs, created_at, revised_at
                     FROM decisions WHERE project_id = ?1 ORDER BY created_at ASC",
                )?;
                let mut rows = stmt.query(rusqlite::params![project_id_str])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_decision(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(CoreError::from)
    }

    // -----------------------------------------------------------------------
    // SteeringCorrection CRUD
    // -----------------------------------------------------------------------

    pub async fn create_correction(&self, correction: &SteeringCorrection) -> Result<(), CoreError> {
        let c = correction.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO steering_corrections (id, correction, domain, source, context,
                        project_id, active, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    rusqlite::params![
                        c.id.to_string(),
                        c.correction,
                        enum_to_sql(&c.domain),
                        enum_to_sql(&c.source),
                        c.context,
                        c.project_id.map(|u| u.to_string()),
                        c.active,
                        ts_to_sql(&c.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    /// Active corrections that apply to a project: global ones plus any
    /// scoped to this specific project.
    pub async fn list_active_corrections(
        &self,
        project_id: Option<Uuid>,
    ) -> Result<Vec<SteeringCorrection>, CoreError> {
        let project_id_str = project_id.map(|u| u.to_string());
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, correction, domain, source, context, project_id, active, created_at
                     FROM steering_corrections
                     WHERE active = 1 AND (project_id IS NULL OR project_id = ?1)
                     ORDER BY created_at ASC",
                )?;
                let mut rows = stmt.query(rusqlite::params![project_id_str])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_correction(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(CoreError::from)
    }

    // -----------------------------------------------------------------------
    // Conversation / Message CRUD
    // -----------------------------------------------------------------------

    pub async fn create_conversation(&self, conversation: &Conversation) -> Result<(), CoreError> {
        let c = conversation.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO conversations (id, session_id, project_id, status,
                        context_usage_tokens, summary, created_at, updated_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7,?8)",
                    rusqlite::params![
                        c.id.to_string(),
                        c.session_id,
                        c.project_id.map(|u| u.to_string()),
                        enum_to_sql(&c.status),
                        c.context_usage_tokens as i64,
                        c.summary,
                        ts_to_sql(&c.created_at),
                        ts_to_sql(&c.updated_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn append_message(&self, message: &Message) -> Result<(), CoreError> {
        let m = message.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO messages (id, conversation_id, project_id, role, content,
                        metadata, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6,?7)",
                    rusqlite::params![
                        m.id.to_string(),
                        m.conversation_id.map(|u| u.to_string()),
                        m.project_id.map(|u| u.to_string()),
                        enum_to_sql(&m.role),
                        m.content,
                        m.metadata.as_ref().map(|v| v.to_string()),
                        ts_to_sql(&m.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn list_messages(&self, conversation_id: Uuid) -> Result<Vec<Message>, CoreError> {
        let conv_str = conversation_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, conversation_id, project_id, role, content, metadata, created_at
                     FROM messages WHERE conversation_id = ?1 ORDER BY created_at ASC",
                )?;
                let mut rows = stmt.query(rusqlite::params![conv_str])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push(row_to_message(row)?);
                }
                Ok(out)
            })
            .await
            .map_err(CoreError::from)
    }

    // -----------------------------------------------------------------------
    // Campaign
    // -----------------------------------------------------------------------

    pub async fn create_campaign(&self, campaign: &Campaign) -> Result<(), CoreError> {
        let c = campaign.clone();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO campaigns (id, project_id, name, baseline, created_at)
                     VALUES (?1,?2,?3,?4,?5)",
                    rusqlite::params![
                        c.id.to_string(),
                        c.project_id.to_string(),
                        c.name,
                        json_to_sql(&c.baseline),
                        ts_to_sql(&c.created_at),
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    pub async fn get_campaign(&self, id: Uuid) -> Result<Option<Campaign>, CoreError> {
        let id_str = id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, project_id, name, baseline, created_at FROM campaigns WHERE id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![id_str])?;
                match rows.next()? {
                    Some(row) => Ok(Some(row_to_campaign(row)?)),
                    None => Ok(None),
                }
            })
            .await
            .map_err(CoreError::from)
    }
}

// ---------------------------------------------------------------------------
// Row mapping helpers
// ---------------------------------------------------------------------------

fn card_select_sql(predicate: &str) -> String {
    format!(
        "SELECT id, project_id, title, description, column_name, labels, due_date,
                linked_decision_ids, linked_message_ids, position, priority, context_snapshot,
                last_session_id, assigned_agent, agent_status, blocked_reason, started_at,
                completed_at, verification_status, campaign_id, created_at, updated_at
         FROM kanban_cards {predicate}"
    )
}

fn row_to_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    let id_str: String = row.get(0)?;
    let status_str: String = row.get(3)?;
    let created_at_str: String = row.get(7)?;
    let updated_at_str: String = row.get(8)?;

    Ok(Project {
        id: Uuid::parse_str(&id_str).expect("valid uuid"),
        name: row.get(1)?,
        description: row.get(2)?,
        status: enum_from_sql::<ProjectStatus>(&status_str),
        color: row.get(4)?,
        agent_timeout_minutes: row.get(5)?,
        max_concurrent_agents: row.get(6)?,
        created_at: ts_from_sql(&created_at_str),
        updated_at: ts_from_sql(&updated_at_str),
    })
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProjectDocument> {
    let id_str: String = row.get(0)?;
    let project_id_str: String = row.get(1)?;
    let doc_type_str: String = row.get(2)?;
    let created_at_str: String = row.get(5)?;
    let updated_at_str: String = row.get(6)?;

    Ok(ProjectDocument {
        id: Uuid::parse_str(&id_str).expect("valid uuid"),
        project_id: Uuid::parse_str(&project_id_str).expect("valid uuid"),
        doc_type: enum_from_sql::<DocumentType>(&doc_type_str),
        title: row.get(3)?,
        content: row.get(4)?,
        created_at: ts_from_sql(&created_at_str),
        updated_at: ts_from_sql(&updated_at_str),
    })
}

fn row_to_card(row: &rusqlite::Row<'_>) -> rusqlite::Result<KanbanCard> {
    let id_str: String = row.get(0)?;
    let project_id_str: String = row.get(1)?;
    let column_str: String = row.get(4)?;
    let labels_str: String = row.get(5)?;
    let due_date_str: Option<String> = row.get(6)?;
    let linked_decisions_str: String = row.get(7)?;
    let linked_messages_str: String = row.get(8)?;
    let last_session_str: Option<String> = row.get(12)?;
    let agent_status_str: Option<String> = row.get(14)?;
    let started_at_str: Option<String> = row.get(16)?;
    let completed_at_str: Option<String> = row.get(17)?;
    let verification_status_str: Option<String> = row.get(18)?;
    let campaign_id_str: Option<String> = row.get(19)?;
    let created_at_str: String = row.get(20)?;
    let updated_at_str: String = row.get(21)?;

    Ok(KanbanCard {
        id: Uuid::parse_str(&id_str).expect("valid uuid"),
        project_id: Uuid::parse_str(&project_id_str).expect("valid uuid"),
        title: row.get(2)?,
        description: row.get(3)?,
        column: enum_from_sql::<Column>(&column_str),
        labels: json_from_sql(&labels_str),
        due_date: opt_ts_from_sql(due_date_str),
        linked_decision_ids: json_from_sql::<Vec<Uuid>>(&linked_decisions_str),
        linked_message_ids: json_from_sql::<Vec<Uuid>>(&linked_messages_str),
        position: row.get(9)?,
        priority: row.get(10)?,
        context_snapshot: row.get(11)?,
        last_session_id: last_session_str.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        assigned_agent: row.get(13)?,
        agent_status: agent_status_str.map(|s| enum_from_sql::<AgentStatus>(&s)),
        blocked_reason: row.get(15)?,
        started_at: opt_ts_from_sql(started_at_str),
        completed_at: opt_ts_from_sql(completed_at_str),
        verification_status: verification_status_str.map(|s| enum_from_sql::<VerificationStatus>(&s)),
        campaign_id: campaign_id_str.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        created_at: ts_from_sql(&created_at_str),
        updated_at: ts_from_sql(&updated_at_str),
    })
}

fn row_to_decision(row: &rusqlite::Row<'_>) -> rusqlite::Result<Decision> {
    let id_str: String = row.get(0)?;
    let project_id_str: String = row.get(1)?;
    let alternatives_str: String = row.get(4)?;
    let created_at_str: String = row.get(7)?;
    let revised_at_str: Option<String> = row.get(8)?;

    Ok(Decision {
        id: Uuid::parse_str(&id_str).expect("valid uuid"),
        project_id: Uuid::parse_str(&project_id_str).expect("valid uuid"),
        title: row.get(2)?,
        description: row.get(3)?,
        alternatives: json_from_sql(&alternatives_str),
        reasoning: row.get(5)?,
        tradeoffs: row.get(6)?,
        created_at: ts_from_sql(&created_at_str),
        revised_at: opt_ts_from_sql(revised_at_str),
    })
}

fn row_to_correction(row: &rusqlite::Row<'_>) -> rusqlite::Result<SteeringCorrection> {
    let id_str: String = row.get(0)?;
    let domain_str: String = row.get(2)?;
    let source_str: String = row.get(3)?;
    let project_id_str: Option<String> = row.get(5)?;
    let created_at_str: String = row.get(7)?;

    Ok(SteeringCorrection {
        id: Uuid::parse_str(&id_str).expect("valid uuid"),
        correction: row.get(1)?,
        domain: enum_from_sql::<CorrectionDomain>(&domain_str),
        source: enum_from_sql::<CorrectionSource>(&source_str),
        context: row.get(4)?,
        project_id: project_id_str.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        active: row.get(6)?,
        created_at: ts_from_sql(&created_at_str),
    })
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let conversation_id_str: Option<String> = row.get(1)?;
    let project_id_str: Option<String> = row.get(2)?;
    let role_str: String = row.get(3)?;
    let metadata_str: Option<String> = row.get(5)?;
    let created_at_str: String = row.get(6)?;

    Ok(Message {
        id: Uuid::parse_str(&id_str).expect("valid uuid"),
        conversation_id: conversation_id_str.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        project_id: project_id_str.map(|s| Uuid::parse_str(&s).expect("valid uuid")),
        role: enum_from_sql::<MessageRole>(&role_str),
        content: row.get(4)?,
        metadata: metadata_str.map(|s| serde_json::from_str(&s).expect("valid json")),
        created_at: ts_from_sql(&created_at_str),
    })
}

fn row_to_campaign(row: &rusqlite::Row<'_>) -> rusqlite::Result<Campaign> {
    let id_str: String = row.get(0)?;
    let project_id_str: String = row.get(1)?;
    let baseline_str: String = row.get(3)?;
    let created_at_str: String = row.get(4)?;

    Ok(Campaign {
        id: Uuid::parse_str(&id_str).expect("valid uuid"),
        project_id: Uuid::parse_str(&project_id_str).expect("valid uuid"),
        name: row.get(2)?,
        baseline: serde_json::from_str(&baseline_str).expect("valid json"),
        created_at: ts_from_sql(&created_at_str),
    })
}

#[allow(dead_code)]
fn conversation_status_roundtrip(s: ConversationStatus) -> String {
    enum_to_sql(&s)
}
