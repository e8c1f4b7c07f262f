use chrono::{DateTime, Utc};
use herdbook_core::{Farm, SyncStatus};
use rusqlite::{params, OptionalExtension};

use crate::{map_unique, parse_enum, parse_opt_ts, parse_ts, Result, Store};

const FARM_COLS: &str = "id, user_id, producer_number, herd_number, name, address, \
                         last_sync_at, sync_status, created_at, updated_at";

impl Store {
    pub fn insert_farm(&self, farm: &Farm) -> Result<()> {
        self.conn()
            .execute(
                "INSERT INTO farms (id, user_id, producer_number, herd_number, name, address, \
                 last_sync_at, sync_status, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    farm.id,
                    farm.user_id,
                    farm.producer_number,
                    farm.herd_number,
                    farm.name,
                    farm.address,
                    farm.last_sync_at.map(|t| t.to_rfc3339()),
                    farm.sync_status.as_str(),
                    farm.created_at.to_rfc3339(),
                    farm.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_unique)?;
        Ok(())
    }

    /// Updates only the fields that were provided.
    pub fn update_farm(
        &self,
        farm_id: &str,
        name: Option<&str>,
        address: Option<&str>,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE farms SET name = COALESCE(?2, name), address = COALESCE(?3, address), \
             updated_at = ?4 WHERE id = ?1",
            params![farm_id, name, address, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn farm_by_id(&self, id: &str) -> Result<Option<Farm>> {
        let farm = self
            .conn()
            .query_row(
                &format!("SELECT {FARM_COLS} FROM farms WHERE id = ?1"),
                params![id],
                row_to_farm,
            )
            .optional()?;
        Ok(farm)
    }

    /// All farms of a user, newest first, each with its animal count.
    pub fn farms_by_user(&self, user_id: &str) -> Result<Vec<(Farm, i64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {FARM_COLS}, \
             (SELECT COUNT(*) FROM animals a WHERE a.farm_id = farms.id) \
             FROM farms WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![user_id], |row| {
            Ok((row_to_farm(row)?, row.get::<_, i64>(10)?))
        })?;
        let mut farms = Vec::new();
        for row in rows {
            farms.push(row?);
        }
        Ok(farms)
    }

    /// Moves the farm through the sync lifecycle. `last_sync_at` is only
    /// written when given, so a failed run keeps the previous timestamp.
    pub fn set_farm_sync(
        &self,
        farm_id: &str,
        status: SyncStatus,
        last_sync_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE farms SET sync_status = ?2, last_sync_at = COALESCE(?3, last_sync_at), \
             updated_at = ?4 WHERE id = ?1",
            params![
                farm_id,
                status.as_str(),
                last_sync_at.map(|t| t.to_rfc3339()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn row_to_farm(row: &rusqlite::Row<'_>) -> rusqlite::Result<Farm> {
    Ok(Farm {
        id: row.get(0)?,
        user_id: row.get(1)?,
        producer_number: row.get(2)?,
        herd_number: row.get(3)?,
        name: row.get(4)?,
        address: row.get(5)?,
        last_sync_at: parse_opt_ts(6, row.get(6)?)?,
        sync_status: parse_enum(7, row.get(7)?)?,
        created_at: parse_ts(8, row.get(8)?)?,
        updated_at: parse_ts(9, row.get(9)?)?,
    })
}
