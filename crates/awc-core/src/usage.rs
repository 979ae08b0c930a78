use chrono::Utc;
use uuid::Uuid;

use crate::error::CoreError;
use crate::store::Store;

/// One recorded usage event — an agent session's token spend, rolled up
/// per project/day for the daily digest and cost dashboards.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct TokenUsage {
    pub id: Uuid,
    pub project_id: Option<Uuid>,
    pub session_id: Option<String>,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Aggregate input/output token counts for a project over some window.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct UsageTotals {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Store {
    pub async fn record_usage(&self, usage: &TokenUsage) -> Result<(), CoreError> {
        let u = usage.clone();
        let created_at = Utc::now().to_rfc3339();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO token_usage (id, project_id, session_id, input_tokens, output_tokens, created_at)
                     VALUES (?1,?2,?3,?4,?5,?6)",
                    rusqlite::params![
                        u.id.to_string(),
                        u.project_id.map(|id| id.to_string()),
                        u.session_id,
                        u.input_tokens as i64,
                        u.output_tokens as i64,
                        created_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(CoreError::from)
    }

    /// Total token usage for a project, across all recorded sessions.
    pub async fn usage_totals_for_project(&self, project_id: Uuid) -> Result<UsageTotals, CoreError> {
        let project_id_str = project_id.to_string();
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT COALESCE(SUM(input_tokens), 0), COALESCE(SUM(output_tokens), 0)
                     FROM token_usage WHERE project_id = ?1",
                )?;
                let mut rows = stmt.query(rusqlite::params![project_id_str])?;
                let row = rows.next()?;
                match row {
                    Some(row) => {
                        let input: i64 = row.get(0)?;
                        let output: i64 = row.get(1)?;
                        Ok(UsageTotals {
                            input_tokens: input as u64,
                            output_tokens: output as u64,
                        })
                    }
                    None => Ok(UsageTotals::default()),
                }
            })
            .await
            .map_err(CoreError::from)
    }
}
