use chrono::Utc;
use herdbook_core::SyncLog;
use rusqlite::{params, OptionalExtension};

use crate::{parse_enum, parse_opt_ts, parse_ts, Result, Store};

const SYNC_COLS: &str =
    "id, farm_id, direction, status, entities_synced, error_message, started_at, completed_at";

impl Store {
    pub fn insert_sync_log(&self, log: &SyncLog) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO sync_logs ({SYNC_COLS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
            ),
            params![
                log.id,
                log.farm_id,
                log.direction.as_str(),
                log.status.as_str(),
                log.entities_synced.map(|n| n as i64),
                log.error_message,
                log.started_at.to_rfc3339(),
                log.completed_at.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    pub fn mark_sync_running(&self, log_id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sync_logs SET status = 'IN_PROGRESS' WHERE id = ?1",
            params![log_id],
        )?;
        Ok(())
    }

    pub fn complete_sync_log(&self, log_id: &str, entities_synced: u64) -> Result<()> {
        self.conn().execute(
            "UPDATE sync_logs SET status = 'COMPLETED', entities_synced = ?2, \
             completed_at = ?3 WHERE id = ?1",
            params![log_id, entities_synced as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn fail_sync_log(&self, log_id: &str, error: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE sync_logs SET status = 'FAILED', error_message = ?2, \
             completed_at = ?3 WHERE id = ?1",
            params![log_id, error, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn sync_log_by_id(&self, id: &str) -> Result<Option<SyncLog>> {
        let log = self
            .conn()
            .query_row(
                &format!("SELECT {SYNC_COLS} FROM sync_logs WHERE id = ?1"),
                params![id],
                row_to_sync_log,
            )
            .optional()?;
        Ok(log)
    }

    /// Most recent runs first.
    pub fn sync_logs_by_farm(&self, farm_id: &str, limit: i64) -> Result<Vec<SyncLog>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYNC_COLS} FROM sync_logs WHERE farm_id = ?1 \
             ORDER BY started_at DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![farm_id, limit], row_to_sync_log)?;
        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }
}

fn row_to_sync_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<SyncLog> {
    Ok(SyncLog {
        id: row.get(0)?,
        farm_id: row.get(1)?,
        direction: parse_enum(2, row.get(2)?)?,
        status: parse_enum(3, row.get(3)?)?,
        entities_synced: row.get::<_, Option<i64>>(4)?.map(|n| n as u64),
        error_message: row.get(5)?,
        started_at: parse_ts(6, row.get(6)?)?,
        completed_at: parse_opt_ts(7, row.get(7)?)?,
    })
}
