use uuid::Uuid;

use crate::error::CoreError;
use crate::store::Store;

/// One full-text match, tagged by the table it came from so a caller can
/// route a click-through without a second round-trip.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SearchHit {
    pub source: SearchSource,
    pub entity_id: Uuid,
    pub title: String,
    pub snippet: String,
    pub rank: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSource {
    KanbanCard,
    ProjectDocument,
    Decision,
}

/// Strip a raw query down to letters, digits and whitespace so it can't be
/// used to inject FTS5 query syntax (`NEAR`, `-`, quoting, column filters).
pub fn sanitize_query(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs one table's FTS query, optionally scoped to a project, and appends
/// its hits to `out`.
fn search_table(
    conn: &rusqlite::Connection,
    fts_table: &str,
    base_table: &str,
    alias: &str,
    source: SearchSource,
    match_expr: &str,
    project_id: Option<&str>,
    out: &mut Vec<SearchHit>,
) -> rusqlite::Result<()> {
    let filter = if project_id.is_some() {
        format!(" AND {alias}.project_id = ?2")
    } else {
        String::new()
    };
    let sql = format!(
        "SELECT {alias}.id, {alias}.title, snippet({fts_table}, 1, '[', ']', '...', 8), bm25({fts_table})
         FROM {fts_table}
         JOIN {base_table} {alias} ON {alias}.rowid = {fts_table}.rowid
         WHERE {fts_table} MATCH ?1{filter}
         ORDER BY bm25({fts_table})"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match project_id {
        Some(pid) => stmt.query(rusqlite::params![match_expr, pid])?,
        None => stmt.query(rusqlite::params![match_expr])?,
    };
    while let Some(row) = rows.next()? {
        let id_str: String = row.get(0)?;
        out.push(SearchHit {
            source,
            entity_id: Uuid::parse_str(&id_str).expect("valid uuid"),
            title: row.get(1)?,
            snippet: row.get(2)?,
            rank: row.get(3)?,
        });
    }
    Ok(())
}

impl Store {
    /// Full-text search across cards, documents and decisions, merged and
    /// ranked, most relevant first. `project_id` of `None` searches across
    /// every project.
    pub async fn search(
        &self,
        project_id: Option<Uuid>,
        raw_query: &str,
    ) -> Result<Vec<SearchHit>, CoreError> {
        let sanitized = sanitize_query(raw_query);
        if sanitized.is_empty() {
            return Ok(Vec::new());
        }

        let project_id_str = project_id.map(|id| id.to_string());
        let match_expr = sanitized.clone();

        let mut hits = self
            .conn
            .call(move |conn| {
                let mut out = Vec::new();
                let pid = project_id_str.as_deref();

                search_table(
                    conn,
                    "kanban_cards_fts",
                    "kanban_cards",
                    "k",
                    SearchSource::KanbanCard,
                    &match_expr,
                    pid,
                    &mut out,
                )?;
                search_table(
                    conn,
                    "project_documents_fts",
                    "project_documents",
                    "d",
                    SearchSource::ProjectDocument,
                    &match_expr,
                    pid,
                    &mut out,
                )?;
                search_table(
                    conn,
                    "decisions_fts",
                    "decisions",
                    "dec",
                    SearchSource::Decision,
                    &match_expr,
                    pid,
                    &mut out,
                )?;

                Ok(out)
            })
            .await
            .map_err(CoreError::from)?;

        // bm25 is negative and smaller-is-better; sort ascending then dedupe
        // by (source, entity_id) in case a row matched more than one column.
        hits.sort_by(|a, b| a.rank.partial_cmp(&b.rank).unwrap_or(std::cmp::Ordering::Equal));

        let mut seen = std::collections::HashSet::new();
        hits.retain(|h| seen.insert((h.source, h.entity_id)));

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KanbanCard, Project};

    #[test]
    fn sanitize_strips_special_characters() {
        assert_eq!(sanitize_query("foo -bar \"baz\""), "foo bar baz");
        assert_eq!(sanitize_query("  multi   space  "), "multi space");
        assert_eq!(sanitize_query("NEAR(a b)"), "NEARa b");
    }

    #[test]
    fn sanitize_empty_query_stays_empty() {
        assert_eq!(sanitize_query("---"), "");
    }

    #[tokio::test]
    async fn search_finds_card_by_title_word() {
        let store = Store::new_in_memory().await.unwrap();
        let project = Project::new("Demo", "demo");
        store.create_project(&project).await.unwrap();

        let card = KanbanCard::new(project.id, "Fix the flaky login test", "details");
        store.create_card(&card).await.unwrap();

        let hits = store.search(Some(project.id), "flaky").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].entity_id, card.id);
        assert_eq!(hits[0].source, SearchSource::KanbanCard);
    }

    #[tokio::test]
    async fn search_blank_query_returns_empty() {
        let store = Store::new_in_memory().await.unwrap();
        let project = Project::new("Demo", "demo");
        store.create_project(&project).await.unwrap();
        let hits = store.search(Some(project.id), "---").await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_with_no_project_finds_hits_across_projects() {
        let store = Store::new_in_memory().await.unwrap();
        let project_a = Project::new("Alpha", "alpha project");
        let project_b = Project::new("Beta", "beta project");
        store.create_project(&project_a).await.unwrap();
        store.create_project(&project_b).await.unwrap();

        let card_a = KanbanCard::new(project_a.id, "Fix the flaky login test", "details");
        let card_b = KanbanCard::new(project_b.id, "Flaky checkout redirect", "details");
        store.create_card(&card_a).await.unwrap();
        store.create_card(&card_b).await.unwrap();

        let hits = store.search(None, "flaky").await.unwrap();
        assert_eq!(hits.len(), 2);

        let scoped = store.search(Some(project_a.id), "flaky").await.unwrap();
        assert_eq!(scoped.len(), 1);
        assert_eq!(scoped[0].entity_id, card_a.id);
    }
}
