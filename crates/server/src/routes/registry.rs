//! Live read-throughs for the categories that never sync into the local
//! herd: poultry is batch-registered, and pig herd stock only exists as
//! registry aggregates.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use herdbook_api::PoultryEventQuery;
use herdbook_registry::{
    NormalizedAnimal, PigHerd, PoultryBatch, PoultryEvent, PoultryEventFilter,
};

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::routes::{irz_credentials_for, owned_farm};
use crate::AppState;

/// Poultry batches plus their herd-record projection.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoultryView {
    pub batches: Vec<PoultryBatch>,
    pub animals: Vec<NormalizedAnimal>,
}

/// GET /api/registry/poultry/farm/{farm_id} — current poultry batches.
pub async fn poultry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farm_id): Path<String>,
) -> Result<Json<PoultryView>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;
    let creds = irz_credentials_for(&state, &user.user_id)?;

    let batches = state
        .registry
        .fetch_poultry(&creds, &farm.producer_number)
        .await?;
    let animals = batches.iter().map(PoultryBatch::to_animal).collect();
    Ok(Json(PoultryView { batches, animals }))
}

/// GET /api/registry/poultry-events/farm/{farm_id} — poultry events
/// (placements, sales, dispatches) filtered by query parameters.
pub async fn poultry_events(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farm_id): Path<String>,
    Query(q): Query<PoultryEventQuery>,
) -> Result<Json<Vec<PoultryEvent>>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;
    let creds = irz_credentials_for(&state, &user.user_id)?;

    let filter = PoultryEventFilter {
        producer_number: Some(farm.producer_number.clone()),
        batch_number: q.batch_number,
        species_code: q.species_code,
        event_type: q.event_type,
        date_from: q.date_from,
        date_to: q.date_to,
        ..Default::default()
    };
    let events = state.registry.fetch_poultry_events(&creds, &filter).await?;
    Ok(Json(events))
}

/// One pig herd with its sow register decoded into animal records.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PigHerdView {
    #[serde(flatten)]
    pub herd: PigHerd,
    pub sows: Vec<NormalizedAnimal>,
}

/// GET /api/registry/pig-herds/farm/{farm_id} — herd-level pig stock.
pub async fn pig_herds(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farm_id): Path<String>,
) -> Result<Json<Vec<PigHerdView>>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;
    let creds = irz_credentials_for(&state, &user.user_id)?;

    let herds = state
        .registry
        .fetch_pig_herds(&creds, &farm.producer_number)
        .await?;
    let out = herds
        .into_iter()
        .map(|herd| {
            let sows = herd.sow_animals();
            PigHerdView { herd, sows }
        })
        .collect();
    Ok(Json(out))
}
