//! Background registry pulls.
//!
//! A sync run is one spawned task that walks every syncable category for a
//! farm and upserts the results. Callers poll progress over HTTP, so each
//! run keeps a snapshot in a shared in-memory map keyed by the sync_logs
//! row id; once the run finishes the log row is the durable record and the
//! map entry only caches its terminal state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use herdbook_core::domain::{ActivityAction, ActivityEntry, EntityType, Farm, SyncStatus};
use herdbook_registry::{Credentials, IrzClient, NormalizedAnimal};
use herdbook_store::{Store, SyncedAnimal};
use tracing::warn;

/// Live and recently finished runs, keyed by job id.
pub type JobRegistry = Arc<Mutex<HashMap<String, JobState>>>;

#[derive(Debug, Clone)]
pub struct JobState {
    pub farm_id: String,
    pub status: SyncStatus,
    pub progress: u8,
    pub entities_synced: Option<u64>,
    pub error: Option<String>,
}

pub fn new_registry() -> JobRegistry {
    Arc::new(Mutex::new(HashMap::new()))
}

pub fn job_snapshot(jobs: &JobRegistry, job_id: &str) -> Option<JobState> {
    jobs.lock()
        .expect("job registry mutex poisoned")
        .get(job_id)
        .cloned()
}

fn register_job(jobs: &JobRegistry, job_id: &str, farm_id: &str) {
    jobs.lock().expect("job registry mutex poisoned").insert(
        job_id.to_string(),
        JobState {
            farm_id: farm_id.to_string(),
            status: SyncStatus::Pending,
            progress: 0,
            entities_synced: None,
            error: None,
        },
    );
}

fn set_progress(jobs: &JobRegistry, job_id: &str, progress: u8) {
    let mut map = jobs.lock().expect("job registry mutex poisoned");
    if let Some(state) = map.get_mut(job_id) {
        state.status = SyncStatus::InProgress;
        state.progress = progress;
    }
}

fn finish(
    jobs: &JobRegistry,
    job_id: &str,
    status: SyncStatus,
    entities: Option<u64>,
    error: Option<String>,
) {
    let mut map = jobs.lock().expect("job registry mutex poisoned");
    if let Some(state) = map.get_mut(job_id) {
        state.status = status;
        if status == SyncStatus::Completed {
            state.progress = 100;
        }
        state.entities_synced = entities;
        state.error = error;
    }
}

/// Registers the job and spawns the run. The caller has already written
/// the pending sync_logs row whose id doubles as the job id.
pub fn spawn_sync(
    store: Arc<Store>,
    registry: Arc<IrzClient>,
    jobs: JobRegistry,
    job_id: String,
    farm: Farm,
    user_id: String,
    creds: Credentials,
) {
    register_job(&jobs, &job_id, &farm.id);

    tokio::spawn(async move {
        match run_sync(&store, &registry, &jobs, &job_id, &farm, &creds).await {
            Ok(count) => {
                if let Err(e) = store.complete_sync_log(&job_id, count) {
                    warn!("complete sync log {job_id}: {e}");
                }
                if let Err(e) = store.set_farm_sync(&farm.id, SyncStatus::Completed, Some(Utc::now()))
                {
                    warn!("update farm sync state: {e}");
                }
                store.record_activity(&ActivityEntry::new(
                    user_id,
                    ActivityAction::SyncComplete,
                    Some(EntityType::Sync),
                    Some(job_id.clone()),
                    Some(serde_json::json!({"entitiesSynced": count})),
                ));
                finish(&jobs, &job_id, SyncStatus::Completed, Some(count), None);
                tracing::info!("sync {job_id} completed, {count} animals");
            }
            Err(e) => {
                let msg = e.to_string();
                if let Err(e) = store.fail_sync_log(&job_id, &msg) {
                    warn!("fail sync log {job_id}: {e}");
                }
                if let Err(e) = store.set_farm_sync(&farm.id, SyncStatus::Failed, None) {
                    warn!("update farm sync state: {e}");
                }
                store.record_activity(&ActivityEntry::new(
                    user_id,
                    ActivityAction::SyncFail,
                    Some(EntityType::Sync),
                    Some(job_id.clone()),
                    Some(serde_json::json!({"error": msg})),
                ));
                finish(&jobs, &job_id, SyncStatus::Failed, None, Some(msg));
                tracing::warn!("sync {job_id} failed");
            }
        }
    });
}

/// One pull across the individually registered categories. A category
/// fetch that fails is logged and skipped so one flaky endpoint does not
/// throw away the rest of the pull; authentication failure aborts the run
/// before any fetch starts.
///
/// Progress checkpoints are fixed so pollers see steady movement: 10 run
/// marked, 20 signed in, 40/60/80 per category, 95 after the upserts.
async fn run_sync(
    store: &Store,
    registry: &IrzClient,
    jobs: &JobRegistry,
    job_id: &str,
    farm: &Farm,
    creds: &Credentials,
) -> anyhow::Result<u64> {
    store.mark_sync_running(job_id)?;
    set_progress(jobs, job_id, 10);

    registry.authenticate(creds).await?;
    set_progress(jobs, job_id, 20);

    let mut animals: Vec<NormalizedAnimal> = Vec::new();

    match registry.fetch_individual(creds, &farm.producer_number).await {
        Ok(batch) => animals.extend(batch),
        Err(e) => warn!("individual animals fetch failed: {e}"),
    }
    set_progress(jobs, job_id, 40);

    match registry.fetch_pigs(creds, &farm.producer_number).await {
        Ok(batch) => animals.extend(batch),
        Err(e) => warn!("pig fetch failed: {e}"),
    }
    set_progress(jobs, job_id, 60);

    match registry.fetch_horses(creds, &farm.producer_number).await {
        Ok(horses) => animals.extend(horses.into_iter().map(|h| h.animal)),
        Err(e) => warn!("horse fetch failed: {e}"),
    }
    set_progress(jobs, job_id, 80);

    let mut synced = 0u64;
    for animal in &animals {
        let incoming = SyncedAnimal {
            irz_id: &animal.irz_id,
            ear_tag_number: &animal.ear_tag_number,
            species: animal.species,
            breed: animal.breed.as_deref(),
            gender: animal.gender,
            birth_date: animal.birth_date.as_deref(),
            mother_ear_tag: animal.mother_ear_tag.as_deref(),
        };
        if store.upsert_synced_animal(&farm.id, &incoming)? {
            synced += 1;
        }
    }
    set_progress(jobs, job_id, 95);

    Ok(synced)
}
