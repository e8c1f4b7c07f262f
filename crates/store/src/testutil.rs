//! Shared fixtures for store tests: a throwaway database plus the minimal
//! user → farm → animal chain the foreign keys require.

use chrono::Utc;
use herdbook_core::{Animal, AnimalStatus, Farm, Gender, Species, User};
use tempfile::TempDir;

use crate::Store;

pub(crate) fn store() -> (Store, TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Store::open(dir.path()).expect("open store");
    (store, dir)
}

pub(crate) fn seed_user(store: &Store) -> User {
    let user = User::new(
        format!("{}@example.com", uuid::Uuid::new_v4()),
        Some("Jan Kowalski".into()),
    );
    store.insert_user(&user).expect("insert user");
    user
}

pub(crate) fn seed_farm(store: &Store, user: &User) -> Farm {
    let farm = Farm::new(
        user.id.clone(),
        "071588967".into(),
        "071588967-001".into(),
        Some("Gospodarstwo Testowe".into()),
        None,
    );
    store.insert_farm(&farm).expect("insert farm");
    farm
}

pub(crate) fn animal(farm_id: &str, ear_tag: &str, species: Species) -> Animal {
    let now = Utc::now();
    Animal {
        id: uuid::Uuid::new_v4().to_string(),
        farm_id: farm_id.to_string(),
        irz_id: None,
        ear_tag_number: ear_tag.to_string(),
        species,
        breed: None,
        gender: Gender::Female,
        birth_date: Some("2024-05-01".into()),
        mother_ear_tag: None,
        status: AnimalStatus::Active,
        synced_at: None,
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn seed_animal(store: &Store, farm: &Farm, ear_tag: &str) -> Animal {
    let a = animal(&farm.id, ear_tag, Species::Cattle);
    store.insert_animal(&a).expect("insert animal");
    a
}
