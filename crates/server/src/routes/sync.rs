use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use herdbook_api::{StartSyncRequest, StartSyncResponse, SyncJobStatus, SyncStatusResponse};
use herdbook_core::domain::{ActivityAction, ActivityEntry, EntityType, SyncLog, SyncStatus};

use crate::error::ApiErr;
use crate::jobs;
use crate::routes::auth::AuthUser;
use crate::routes::{irz_credentials_for, owned_farm};
use crate::AppState;

// ---------------------------------------------------------------------------
// Start
// ---------------------------------------------------------------------------

/// POST /api/sync/start — kick off a registry pull for a farm. Answers
/// 202 with the job id; progress is polled via the status endpoint.
pub async fn start_sync(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<StartSyncRequest>,
) -> Result<(StatusCode, Json<StartSyncResponse>), ApiErr> {
    let farm = owned_farm(&state, &req.farm_id, &user.user_id)?;
    let creds = irz_credentials_for(&state, &user.user_id)?;

    let log = SyncLog::start_pull(farm.id.clone());
    state.store.insert_sync_log(&log)?;
    state
        .store
        .set_farm_sync(&farm.id, SyncStatus::InProgress, None)?;

    state.store.record_activity(&ActivityEntry::new(
        user.user_id.clone(),
        ActivityAction::SyncStart,
        Some(EntityType::Sync),
        Some(log.id.clone()),
        None,
    ));

    jobs::spawn_sync(
        state.store.clone(),
        state.registry.clone(),
        state.jobs.clone(),
        log.id.clone(),
        farm,
        user.user_id,
        creds,
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(StartSyncResponse {
            job_id: log.id,
            status: SyncJobStatus::Pending,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// GET /api/sync/status/{job_id} — poll a sync job.
///
/// Unknown ids (and other users' jobs) answer in-band with NOT_FOUND
/// rather than a 404, so a poller always gets a parseable body. Live runs
/// answer from the in-memory registry, which carries progress the log row
/// does not; finished runs fall back to the sync_logs row and survive a
/// server restart.
pub async fn sync_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(job_id): Path<String>,
) -> Result<Json<SyncStatusResponse>, ApiErr> {
    let Some(log) = state.store.sync_log_by_id(&job_id)? else {
        return Ok(Json(SyncStatusResponse::not_found(job_id)));
    };
    let owns = state
        .store
        .farm_by_id(&log.farm_id)?
        .is_some_and(|f| f.user_id == user.user_id);
    if !owns {
        return Ok(Json(SyncStatusResponse::not_found(job_id)));
    }

    if let Some(job) = jobs::job_snapshot(&state.jobs, &job_id) {
        return Ok(Json(SyncStatusResponse {
            job_id,
            status: job.status.into(),
            progress: Some(job.progress),
            entities_synced: job.entities_synced,
            error_message: job.error,
            started_at: Some(log.started_at),
            completed_at: log.completed_at,
        }));
    }

    Ok(Json(SyncStatusResponse {
        job_id,
        status: log.status.into(),
        progress: matches!(log.status, SyncStatus::Completed).then_some(100),
        entities_synced: log.entities_synced,
        error_message: log.error_message,
        started_at: Some(log.started_at),
        completed_at: log.completed_at,
    }))
}

// ---------------------------------------------------------------------------
// Logs
// ---------------------------------------------------------------------------

/// GET /api/sync/logs/{farm_id} — recent runs for a farm, newest first.
pub async fn sync_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farm_id): Path<String>,
) -> Result<Json<Vec<SyncLog>>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;
    Ok(Json(state.store.sync_logs_by_farm(&farm.id, 20)?))
}
