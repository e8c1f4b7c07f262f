use chrono::Utc;
use herdbook_core::{Animal, AnimalEvent, AnimalStatus, EventType, Gender, Species};
use rusqlite::{params, OptionalExtension};

use crate::{map_unique, parse_enum, parse_opt_ts, parse_ts, Result, Store};

const ANIMAL_COLS: &str = "id, farm_id, irz_id, ear_tag_number, species, breed, gender, \
                           birth_date, mother_ear_tag, status, synced_at, created_at, updated_at";

const EVENT_COLS: &str = "id, animal_id, event_type, event_date, description";

/// One animal as the registry reported it, ready for the sync upsert.
/// Borrows from the normalized fetch results so a pull of thousands of
/// records does not clone every field again.
#[derive(Debug, Clone, Copy)]
pub struct SyncedAnimal<'a> {
    pub irz_id: &'a str,
    pub ear_tag_number: &'a str,
    pub species: Species,
    pub breed: Option<&'a str>,
    pub gender: Gender,
    pub birth_date: Option<&'a str>,
    pub mother_ear_tag: Option<&'a str>,
}

/// Filters for the animal list endpoint.
#[derive(Debug, Clone)]
pub struct AnimalQuery {
    pub species: Option<Species>,
    pub status: Option<AnimalStatus>,
    /// Matched against ear tag and breed with LIKE.
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl Default for AnimalQuery {
    fn default() -> Self {
        Self {
            species: None,
            status: None,
            search: None,
            limit: 50,
            offset: 0,
        }
    }
}

impl Store {
    /// Inserts or refreshes one registry-reported animal. The row is keyed
    /// by `(farm_id, ear_tag_number)`; on conflict only the registry-owned
    /// fields and the sync timestamp change, so re-running a sync leaves
    /// locally managed state (status, manual edits) untouched.
    ///
    /// Records without an ear tag cannot be keyed and are skipped;
    /// returns whether the record was written.
    pub fn upsert_synced_animal(&self, farm_id: &str, incoming: &SyncedAnimal<'_>) -> Result<bool> {
        let ear_tag = incoming.ear_tag_number.trim();
        if ear_tag.is_empty() {
            return Ok(false);
        }
        let now = Utc::now().to_rfc3339();
        self.conn().execute(
            "INSERT INTO animals (id, farm_id, irz_id, ear_tag_number, species, breed, gender, \
             birth_date, mother_ear_tag, status, synced_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'ACTIVE', ?10, ?11, ?11) \
             ON CONFLICT(farm_id, ear_tag_number) DO UPDATE SET \
             irz_id = excluded.irz_id, breed = excluded.breed, synced_at = excluded.synced_at",
            params![
                uuid::Uuid::new_v4().to_string(),
                farm_id,
                incoming.irz_id,
                ear_tag,
                incoming.species.as_str(),
                incoming.breed,
                incoming.gender.as_str(),
                incoming.birth_date,
                incoming.mother_ear_tag,
                now,
                now,
            ],
        )?;
        Ok(true)
    }

    /// Fails with [`crate::StoreError::Duplicate`] when the ear tag is
    /// already registered on this farm.
    pub fn insert_animal(&self, animal: &Animal) -> Result<()> {
        self.conn()
            .execute(
                &format!("INSERT INTO animals ({ANIMAL_COLS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
                params![
                    animal.id,
                    animal.farm_id,
                    animal.irz_id,
                    animal.ear_tag_number,
                    animal.species.as_str(),
                    animal.breed,
                    animal.gender.as_str(),
                    animal.birth_date,
                    animal.mother_ear_tag,
                    animal.status.as_str(),
                    animal.synced_at.map(|t| t.to_rfc3339()),
                    animal.created_at.to_rfc3339(),
                    animal.updated_at.to_rfc3339(),
                ],
            )
            .map_err(map_unique)?;
        Ok(())
    }

    pub fn animal_by_id(&self, id: &str) -> Result<Option<Animal>> {
        let animal = self
            .conn()
            .query_row(
                &format!("SELECT {ANIMAL_COLS} FROM animals WHERE id = ?1"),
                params![id],
                row_to_animal,
            )
            .optional()?;
        Ok(animal)
    }

    pub fn animal_by_ear_tag(&self, farm_id: &str, ear_tag: &str) -> Result<Option<Animal>> {
        let animal = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {ANIMAL_COLS} FROM animals \
                     WHERE farm_id = ?1 AND ear_tag_number = ?2"
                ),
                params![farm_id, ear_tag],
                row_to_animal,
            )
            .optional()?;
        Ok(animal)
    }

    pub fn set_animal_status(&self, animal_id: &str, status: AnimalStatus) -> Result<()> {
        self.conn().execute(
            "UPDATE animals SET status = ?2, updated_at = ?3 WHERE id = ?1",
            params![animal_id, status.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// One page of a farm's animals plus the total match count, newest first.
    pub fn list_animals(&self, farm_id: &str, query: &AnimalQuery) -> Result<(Vec<Animal>, u64)> {
        let mut where_clauses = vec!["farm_id = ?1".to_string()];
        let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> =
            vec![Box::new(farm_id.to_string())];
        let mut idx = 2u32;

        if let Some(species) = query.species {
            where_clauses.push(format!("species = ?{idx}"));
            param_values.push(Box::new(species.as_str()));
            idx += 1;
        }

        if let Some(status) = query.status {
            where_clauses.push(format!("status = ?{idx}"));
            param_values.push(Box::new(status.as_str()));
            idx += 1;
        }

        if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let like = format!("%{search}%");
            where_clauses.push(format!(
                "(ear_tag_number LIKE ?{i1} OR breed LIKE ?{i2})",
                i1 = idx,
                i2 = idx + 1,
            ));
            param_values.push(Box::new(like.clone()));
            param_values.push(Box::new(like));
            idx += 2;
        }

        let where_str = where_clauses.join(" AND ");
        let conn = self.conn();

        let total: i64 = {
            let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                param_values.iter().map(|p| p.as_ref()).collect();
            conn.query_row(
                &format!("SELECT COUNT(*) FROM animals WHERE {where_str}"),
                param_refs.as_slice(),
                |row| row.get(0),
            )?
        };

        param_values.push(Box::new(query.limit));
        param_values.push(Box::new(query.offset));
        let sql = format!(
            "SELECT {ANIMAL_COLS} FROM animals WHERE {where_str} \
             ORDER BY created_at DESC, id DESC LIMIT ?{i1} OFFSET ?{i2}",
            i1 = idx,
            i2 = idx + 1,
        );

        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            param_values.iter().map(|p| p.as_ref()).collect();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), row_to_animal)?;

        let mut animals = Vec::new();
        for row in rows {
            animals.push(row?);
        }
        Ok((animals, total as u64))
    }

    pub fn count_animals(&self, farm_id: &str) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM animals WHERE farm_id = ?1",
            params![farm_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_active_animals(&self, farm_id: &str) -> Result<i64> {
        let count = self.conn().query_row(
            "SELECT COUNT(*) FROM animals WHERE farm_id = ?1 AND status = 'ACTIVE'",
            params![farm_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Active herd composition, largest group first.
    pub fn animals_by_species(&self, farm_id: &str) -> Result<Vec<(Species, i64)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT species, COUNT(*) FROM animals \
             WHERE farm_id = ?1 AND status = 'ACTIVE' \
             GROUP BY species ORDER BY COUNT(*) DESC",
        )?;
        let rows = stmt.query_map(params![farm_id], |row| {
            Ok((parse_enum(0, row.get(0)?)?, row.get::<_, i64>(1)?))
        })?;
        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }
        Ok(groups)
    }

    // ── Animal events ──────────────────────────────────────────────────

    pub fn insert_event(&self, event: &AnimalEvent) -> Result<()> {
        self.conn().execute(
            &format!("INSERT INTO animal_events ({EVENT_COLS}) VALUES (?1, ?2, ?3, ?4, ?5)"),
            params![
                event.id,
                event.animal_id,
                event.event_type.as_str(),
                event.event_date,
                event.description,
            ],
        )?;
        Ok(())
    }

    pub fn events_by_animal(&self, animal_id: &str) -> Result<Vec<AnimalEvent>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EVENT_COLS} FROM animal_events \
             WHERE animal_id = ?1 ORDER BY event_date DESC"
        ))?;
        let rows = stmt.query_map(params![animal_id], row_to_event)?;
        let mut events = Vec::new();
        for row in rows {
            events.push(row?);
        }
        Ok(events)
    }
}

pub(crate) fn row_to_animal(row: &rusqlite::Row<'_>) -> rusqlite::Result<Animal> {
    Ok(Animal {
        id: row.get(0)?,
        farm_id: row.get(1)?,
        irz_id: row.get(2)?,
        ear_tag_number: row.get(3)?,
        species: parse_enum(4, row.get(4)?)?,
        breed: row.get(5)?,
        gender: parse_enum(6, row.get(6)?)?,
        birth_date: row.get(7)?,
        mother_ear_tag: row.get(8)?,
        status: parse_enum(9, row.get(9)?)?,
        synced_at: parse_opt_ts(10, row.get(10)?)?,
        created_at: parse_ts(11, row.get(11)?)?,
        updated_at: parse_ts(12, row.get(12)?)?,
    })
}

fn row_to_event(row: &rusqlite::Row<'_>) -> rusqlite::Result<AnimalEvent> {
    Ok(AnimalEvent {
        id: row.get(0)?,
        animal_id: row.get(1)?,
        event_type: parse_enum(2, row.get(2)?)?,
        event_date: row.get(3)?,
        description: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil;
    use crate::StoreError;

    fn synced<'a>(irz_id: &'a str, ear_tag: &'a str) -> SyncedAnimal<'a> {
        SyncedAnimal {
            irz_id,
            ear_tag_number: ear_tag,
            species: Species::Cattle,
            breed: Some("HO"),
            gender: Gender::Female,
            birth_date: Some("2023-03-14"),
            mother_ear_tag: Some("PL005111111111"),
        }
    }

    #[test]
    fn upsert_twice_keeps_one_row_and_local_state() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);

        assert!(store
            .upsert_synced_animal(&farm.id, &synced("PL005123", "PL005123"))
            .unwrap());
        let first = store
            .animal_by_ear_tag(&farm.id, "PL005123")
            .unwrap()
            .unwrap();
        store
            .set_animal_status(&first.id, AnimalStatus::Sold)
            .unwrap();

        // Same ear tag again with a changed breed.
        let mut again = synced("PL005123", "PL005123");
        again.breed = Some("SM");
        assert!(store.upsert_synced_animal(&farm.id, &again).unwrap());

        assert_eq!(store.count_active_animals(&farm.id).unwrap(), 0);
        let reloaded = store
            .animal_by_ear_tag(&farm.id, "PL005123")
            .unwrap()
            .unwrap();
        assert_eq!(reloaded.id, first.id);
        assert_eq!(reloaded.breed.as_deref(), Some("SM"));
        // status set locally survives the second pull
        assert_eq!(reloaded.status, AnimalStatus::Sold);
        assert!(reloaded.synced_at.unwrap() >= first.synced_at.unwrap());
    }

    #[test]
    fn upsert_skips_records_without_ear_tag() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);

        assert!(!store
            .upsert_synced_animal(&farm.id, &synced("x", "   "))
            .unwrap());
        let (animals, total) = store
            .list_animals(&farm.id, &AnimalQuery::default())
            .unwrap();
        assert!(animals.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn duplicate_ear_tag_on_same_farm_is_rejected() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);
        testutil::seed_animal(&store, &farm, "PL005123456789");

        let dup = testutil::animal(&farm.id, "PL005123456789", Species::Cattle);
        assert!(matches!(
            store.insert_animal(&dup),
            Err(StoreError::Duplicate)
        ));

        // The same tag on another farm is a different animal.
        let other = testutil::seed_farm(&store, &user);
        let ok = testutil::animal(&other.id, "PL005123456789", Species::Cattle);
        store.insert_animal(&ok).unwrap();
    }

    #[test]
    fn list_filters_compose() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);

        let mut cow = testutil::animal(&farm.id, "PL005000000001", Species::Cattle);
        cow.breed = Some("Holstein".into());
        store.insert_animal(&cow).unwrap();
        let mut pig = testutil::animal(&farm.id, "PL005000000002", Species::Pig);
        pig.status = AnimalStatus::Sold;
        store.insert_animal(&pig).unwrap();
        store
            .insert_animal(&testutil::animal(&farm.id, "FR441234", Species::Cattle))
            .unwrap();

        let (all, total) = store
            .list_animals(&farm.id, &AnimalQuery::default())
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(total, 3);

        let by_species = AnimalQuery {
            species: Some(Species::Pig),
            ..Default::default()
        };
        let (pigs, total) = store.list_animals(&farm.id, &by_species).unwrap();
        assert_eq!(total, 1);
        assert_eq!(pigs[0].ear_tag_number, "PL005000000002");

        let by_status = AnimalQuery {
            status: Some(AnimalStatus::Active),
            ..Default::default()
        };
        let (_, total) = store.list_animals(&farm.id, &by_status).unwrap();
        assert_eq!(total, 2);

        // search hits ear tags and breeds
        let by_search = AnimalQuery {
            search: Some("holst".into()),
            ..Default::default()
        };
        let (hits, total) = store.list_animals(&farm.id, &by_search).unwrap();
        assert_eq!(total, 1);
        assert_eq!(hits[0].id, cow.id);

        let by_tag = AnimalQuery {
            species: Some(Species::Cattle),
            search: Some("FR44".into()),
            ..Default::default()
        };
        let (hits, total) = store.list_animals(&farm.id, &by_tag).unwrap();
        assert_eq!(total, 1);
        assert_eq!(hits[0].ear_tag_number, "FR441234");
    }

    #[test]
    fn list_paginates() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);
        for i in 0..5 {
            testutil::seed_animal(&store, &farm, &format!("PL00500000000{i}"));
        }

        let page = AnimalQuery {
            limit: 2,
            offset: 4,
            ..Default::default()
        };
        let (animals, total) = store.list_animals(&farm.id, &page).unwrap();
        assert_eq!(total, 5);
        assert_eq!(animals.len(), 1);
    }

    #[test]
    fn species_breakdown_counts_only_active() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);
        for i in 0..3 {
            store
                .insert_animal(&testutil::animal(
                    &farm.id,
                    &format!("PL00510000000{i}"),
                    Species::Cattle,
                ))
                .unwrap();
        }
        store
            .insert_animal(&testutil::animal(&farm.id, "PL005200000001", Species::Sheep))
            .unwrap();
        let dead = testutil::animal(&farm.id, "PL005200000002", Species::Sheep);
        store.insert_animal(&dead).unwrap();
        store
            .set_animal_status(&dead.id, AnimalStatus::Deceased)
            .unwrap();

        let groups = store.animals_by_species(&farm.id).unwrap();
        assert_eq!(groups, vec![(Species::Cattle, 3), (Species::Sheep, 1)]);
    }

    #[test]
    fn events_come_back_newest_first() {
        let (store, _dir) = testutil::store();
        let user = testutil::seed_user(&store);
        let farm = testutil::seed_farm(&store, &user);
        let animal = testutil::seed_animal(&store, &farm, "PL005123456789");

        store
            .insert_event(&AnimalEvent::new(
                animal.id.clone(),
                EventType::Birth,
                "2023-03-14".into(),
                None,
            ))
            .unwrap();
        store
            .insert_event(&AnimalEvent::new(
                animal.id.clone(),
                EventType::TransferIn,
                "2024-01-02".into(),
                Some("from 071588968-001".into()),
            ))
            .unwrap();

        let events = store.events_by_animal(&animal.id).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::TransferIn);
        assert_eq!(events[1].event_type, EventType::Birth);
    }
}
