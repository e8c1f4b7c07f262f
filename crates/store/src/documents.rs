use chrono::Utc;
use herdbook_core::{Animal, Document, DocumentStatus, DocumentType};
use rusqlite::{params, OptionalExtension};

use crate::{parse_enum, parse_json, parse_opt_json, parse_opt_ts, parse_ts, Result, Store};

const DOC_COLS: &str = "id, farm_id, animal_id, doc_type, status, form_data, \
                        irz_doc_number, irz_response, submitted_at, created_at, updated_at";

impl Store {
    pub fn insert_document(&self, doc: &Document) -> Result<()> {
        self.conn().execute(
            &format!(
                "INSERT INTO documents ({DOC_COLS}) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ),
            params![
                doc.id,
                doc.farm_id,
                doc.animal_id,
                doc.doc_type.as_str(),
                doc.status.as_str(),
                doc.form_data.to_string(),
                doc.irz_doc_number,
                doc.irz_response.as_ref().map(|v| v.to_string()),
                doc.submitted_at.map(|t| t.to_rfc3339()),
                doc.created_at.to_rfc3339(),
                doc.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn document_by_id(&self, id: &str) -> Result<Option<Document>> {
        let doc = self
            .conn()
            .query_row(
                &format!("SELECT {DOC_COLS} FROM documents WHERE id = ?1"),
                params![id],
                row_to_document,
            )
            .optional()?;
        Ok(doc)
    }

    pub fn documents_by_farm(&self, farm_id: &str) -> Result<Vec<Document>> {
        self.documents_where("farm_id = ?1", farm_id)
    }

    pub fn documents_by_animal(&self, animal_id: &str) -> Result<Vec<Document>> {
        self.documents_where("animal_id = ?1", animal_id)
    }

    fn documents_where(&self, clause: &str, id: &str) -> Result<Vec<Document>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOC_COLS} FROM documents WHERE {clause} ORDER BY created_at DESC"
        ))?;
        let rows = stmt.query_map(params![id], row_to_document)?;
        let mut docs = Vec::new();
        for row in rows {
            docs.push(row?);
        }
        Ok(docs)
    }

    /// Claims the document for submission so a second submit attempt is
    /// turned away while the first is still talking to the registry.
    pub fn set_document_pending(&self, doc_id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE documents SET status = 'PENDING', updated_at = ?2 WHERE id = ?1",
            params![doc_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn mark_document_submitted(
        &self,
        doc_id: &str,
        doc_number: &str,
        response: Option<&serde_json::Value>,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "UPDATE documents SET status = 'SUBMITTED', irz_doc_number = ?2, \
             irz_response = ?3, submitted_at = ?4, updated_at = ?4 WHERE id = ?1",
            params![doc_id, doc_number, response.map(|v| v.to_string()), now],
        )?;
        Ok(())
    }

    pub fn mark_document_error(
        &self,
        doc_id: &str,
        response: Option<&serde_json::Value>,
    ) -> Result<()> {
        self.conn().execute(
            "UPDATE documents SET status = 'ERROR', irz_response = ?2, updated_at = ?3 \
             WHERE id = ?1",
            params![
                doc_id,
                response.map(|v| v.to_string()),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn count_documents_with_status(
        &self,
        farm_id: &str,
        status: DocumentStatus,
    ) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM documents WHERE farm_id = ?1 AND status = ?2",
            params![farm_id, status.as_str()],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Unsubmitted drafts of one type, oldest first so the longest overdue
    /// report leads the reminder list.
    pub fn draft_documents_of_type(
        &self,
        farm_id: &str,
        doc_type: DocumentType,
    ) -> Result<Vec<Document>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DOC_COLS} FROM documents \
             WHERE farm_id = ?1 AND status = 'DRAFT' AND doc_type = ?2 \
             ORDER BY created_at ASC"
        ))?;
        let rows = stmt.query_map(params![farm_id, doc_type.as_str()], row_to_document)?;
        let mut docs = Vec::new();
        for row in rows {
            docs.push(row?);
        }
        Ok(docs)
    }

    /// Active animals born on or after `since` (an ISO date) that have no
    /// birth report yet, drafted or otherwise.
    pub fn animals_born_since_without_birth_report(
        &self,
        farm_id: &str,
        since: &str,
    ) -> Result<Vec<Animal>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT a.id, a.farm_id, a.irz_id, a.ear_tag_number, a.species, a.breed, a.gender, \
             a.birth_date, a.mother_ear_tag, a.status, a.synced_at, a.created_at, a.updated_at \
             FROM animals a \
             WHERE a.farm_id = ?1 AND a.status = 'ACTIVE' \
               AND a.birth_date IS NOT NULL AND a.birth_date >= ?2 \
               AND NOT EXISTS (SELECT 1 FROM documents d \
                               WHERE d.animal_id = a.id AND d.doc_type = 'BIRTH_REPORT') \
             ORDER BY a.birth_date ASC",
        )?;
        let rows = stmt.query_map(params![farm_id, since], crate::animals::row_to_animal)?;
        let mut animals = Vec::new();
        for row in rows {
            animals.push(row?);
        }
        Ok(animals)
    }
}

fn row_to_document(row: &rusqlite::Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        farm_id: row.get(1)?,
        animal_id: row.get(2)?,
        doc_type: parse_enum(3, row.get(3)?)?,
        status: parse_enum(4, row.get(4)?)?,
        form_data: parse_json(5, row.get(5)?)?,
        irz_doc_number: row.get(6)?,
        irz_response: parse_opt_json(7, row.get(7)?)?,
        submitted_at: parse_opt_ts(8, row.get(8)?)?,
        created_at: parse_ts(9, row.get(9)?)?,
        updated_at: parse_ts(10, row.get(10)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use serde_json::json;

    fn draft(farm_id: &str, animal_id: Option<String>, doc_type: DocumentType) -> Document {
        Document::new_draft(
            farm_id.to_string(),
            animal_id,
            doc_type,
            json!({"earTagNumber": "PL005123456789"}),
        )
    }

    #[test]
    fn form_data_and_response_round_trip_as_json() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);

        let doc = draft(&farm.id, None, DocumentType::DeathReport);
        store.insert_document(&doc).unwrap();

        let loaded = store.document_by_id(&doc.id).unwrap().unwrap();
        assert_eq!(loaded.status, DocumentStatus::Draft);
        assert_eq!(loaded.form_data["earTagNumber"], "PL005123456789");
        assert!(loaded.irz_response.is_none());

        store
            .mark_document_submitted(&doc.id, "ZPZU-1724580000000", Some(&json!({"ok": true})))
            .unwrap();
        let submitted = store.document_by_id(&doc.id).unwrap().unwrap();
        assert_eq!(submitted.status, DocumentStatus::Submitted);
        assert_eq!(submitted.irz_doc_number.as_deref(), Some("ZPZU-1724580000000"));
        assert_eq!(submitted.irz_response.unwrap()["ok"], true);
        assert!(submitted.submitted_at.is_some());
    }

    #[test]
    fn submission_lifecycle_gates() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);
        let doc = draft(&farm.id, None, DocumentType::DeathReport);
        store.insert_document(&doc).unwrap();

        store.set_document_pending(&doc.id).unwrap();
        let pending = store.document_by_id(&doc.id).unwrap().unwrap();
        assert_eq!(pending.status, DocumentStatus::Pending);
        assert!(!pending.can_submit());

        store
            .mark_document_error(&doc.id, Some(&json!({"error": "timeout"})))
            .unwrap();
        let errored = store.document_by_id(&doc.id).unwrap().unwrap();
        assert_eq!(errored.status, DocumentStatus::Error);
        // a failed submission can be retried
        assert!(errored.can_submit());
    }

    #[test]
    fn draft_reminders_come_back_oldest_first() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);

        let mut old = draft(&farm.id, None, DocumentType::DeathReport);
        old.created_at = old.created_at - chrono::Duration::days(5);
        store.insert_document(&old).unwrap();
        let fresh = draft(&farm.id, None, DocumentType::DeathReport);
        store.insert_document(&fresh).unwrap();
        // other types and submitted drafts stay out of the death list
        store
            .insert_document(&draft(&farm.id, None, DocumentType::BirthReport))
            .unwrap();

        let drafts = store
            .draft_documents_of_type(&farm.id, DocumentType::DeathReport)
            .unwrap();
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].id, old.id);
        assert_eq!(drafts[1].id, fresh.id);

        assert_eq!(
            store
                .count_documents_with_status(&farm.id, DocumentStatus::Draft)
                .unwrap(),
            3
        );
    }

    #[test]
    fn birth_report_gap_query() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);

        let mut calf = testutil::animal(&farm.id, "PL005000000001", herdbook_core::Species::Cattle);
        calf.birth_date = Some("2026-08-20".into());
        store.insert_animal(&calf).unwrap();

        let mut reported =
            testutil::animal(&farm.id, "PL005000000002", herdbook_core::Species::Cattle);
        reported.birth_date = Some("2026-08-21".into());
        store.insert_animal(&reported).unwrap();
        store
            .insert_document(&draft(
                &farm.id,
                Some(reported.id.clone()),
                DocumentType::BirthReport,
            ))
            .unwrap();

        let mut older = testutil::animal(&farm.id, "PL005000000003", herdbook_core::Species::Cattle);
        older.birth_date = Some("2026-07-01".into());
        store.insert_animal(&older).unwrap();

        let missing = store
            .animals_born_since_without_birth_report(&farm.id, "2026-08-11")
            .unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].id, calf.id);
    }
}
