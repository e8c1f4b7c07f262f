use herdbook_core::ActivityEntry;
use rusqlite::params;
use tracing::warn;

use crate::{parse_enum, parse_opt_enum, parse_opt_json, parse_ts, Result, Store};

const ACT_COLS: &str = "id, user_id, action, entity_type, entity_id, details, created_at";

impl Store {
    /// Best-effort audit write. The log must never take a user-facing
    /// operation down with it, so failures are logged and dropped.
    pub fn record_activity(&self, entry: &ActivityEntry) {
        if let Err(e) = self.insert_activity(entry) {
            warn!("activity log write failed: {e}");
        }
    }

    fn insert_activity(&self, entry: &ActivityEntry) -> Result<()> {
        self.conn().execute(
            &format!("INSERT INTO activity_log ({ACT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
            params![
                entry.id,
                entry.user_id,
                entry.action.as_str(),
                entry.entity_type.map(|t| t.as_str()),
                entry.entity_id,
                entry.details.as_ref().map(|v| v.to_string()),
                entry.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Most recent entries first.
    pub fn activity_by_user(&self, user_id: &str, limit: i64) -> Result<Vec<ActivityEntry>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {ACT_COLS} FROM activity_log WHERE user_id = ?1 \
             ORDER BY created_at DESC LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![user_id, limit], row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> rusqlite::Result<ActivityEntry> {
    Ok(ActivityEntry {
        id: row.get(0)?,
        user_id: row.get(1)?,
        action: parse_enum(2, row.get(2)?)?,
        entity_type: parse_opt_enum(3, row.get(3)?)?,
        entity_id: row.get(4)?,
        details: parse_opt_json(5, row.get(5)?)?,
        created_at: parse_ts(6, row.get(6)?)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::testutil;
    use herdbook_core::{ActivityAction, ActivityEntry, EntityType};
    use serde_json::json;

    #[test]
    fn records_and_lists_newest_first() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);

        let mut first = ActivityEntry::new(
            user.id.clone(),
            ActivityAction::FarmCreate,
            Some(EntityType::Farm),
            Some("farm-1".into()),
            Some(json!({"name": "Gospodarstwo Testowe"})),
        );
        first.created_at = first.created_at - chrono::Duration::seconds(5);
        store.record_activity(&first);
        store.record_activity(&ActivityEntry::new(
            user.id.clone(),
            ActivityAction::SyncStart,
            Some(EntityType::Farm),
            Some("farm-1".into()),
            None,
        ));

        let entries = store.activity_by_user(&user.id, 10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].action, ActivityAction::SyncStart);
        assert_eq!(entries[1].action, ActivityAction::FarmCreate);
        assert_eq!(
            entries[1].details.as_ref().unwrap()["name"],
            "Gospodarstwo Testowe"
        );

        let limited = store.activity_by_user(&user.id, 1).unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[test]
    fn failed_write_does_not_surface() {
        let (store, _dir) = testutil::store();
        // unknown user violates the foreign key; record_activity swallows it
        let entry = ActivityEntry::new(
            "missing-user".into(),
            ActivityAction::Register,
            None,
            None,
            None,
        );
        store.record_activity(&entry);
        assert!(store.activity_by_user("missing-user", 10).unwrap().is_empty());
    }
}
