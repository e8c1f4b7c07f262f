use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use herdbook_api::{
    crypto, service, CreateFarmRequest, FarmResponse, OkMessage, SetIrzCredentialsRequest,
    UpdateFarmRequest,
};
use herdbook_core::domain::{ActivityAction, ActivityEntry, EntityType, Farm};
use herdbook_core::ident::{
    herd_matches_producer, validate_herd_number, validate_producer_number,
};

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::routes::owned_farm;
use crate::AppState;

// ---------------------------------------------------------------------------
// List / create
// ---------------------------------------------------------------------------

/// GET /api/farms — the caller's farms with animal counts, newest first.
pub async fn list_farms(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<FarmResponse>>, ApiErr> {
    let farms = state.store.farms_by_user(&user.user_id)?;
    let out = farms
        .into_iter()
        .map(|(farm, count)| FarmResponse {
            farm,
            animals_count: count.max(0) as u64,
        })
        .collect();
    Ok(Json(out))
}

/// POST /api/farms — register a holding under the caller's account.
pub async fn create_farm(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<CreateFarmRequest>,
) -> Result<(StatusCode, Json<FarmResponse>), ApiErr> {
    let producer = req.producer_number.trim();
    let herd = req.herd_number.trim();
    validate_producer_number(producer).map_err(|e| ApiErr::bad_request(e.to_string()))?;
    validate_herd_number(herd).map_err(|e| ApiErr::bad_request(e.to_string()))?;
    if !herd_matches_producer(herd, producer) {
        return Err(ApiErr::bad_request(
            "herd number does not belong to this producer number",
        ));
    }

    let farm = Farm::new(
        user.user_id.clone(),
        producer.to_string(),
        herd.to_string(),
        nonempty(req.name),
        nonempty(req.address),
    );
    state.store.insert_farm(&farm)?;

    state.store.record_activity(&ActivityEntry::new(
        user.user_id,
        ActivityAction::FarmCreate,
        Some(EntityType::Farm),
        Some(farm.id.clone()),
        Some(serde_json::json!({"herdNumber": farm.herd_number})),
    ));

    Ok((
        StatusCode::CREATED,
        Json(FarmResponse {
            farm,
            animals_count: 0,
        }),
    ))
}

fn nonempty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ---------------------------------------------------------------------------
// Get / update
// ---------------------------------------------------------------------------

/// GET /api/farms/{id} — one farm with its animal count.
pub async fn get_farm(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FarmResponse>, ApiErr> {
    let farm = owned_farm(&state, &id, &user.user_id)?;
    let count = state.store.count_animals(&farm.id)?;
    Ok(Json(FarmResponse {
        farm,
        animals_count: count.max(0) as u64,
    }))
}

/// PUT /api/farms/{id} — update name and address. Omitted or blank fields
/// keep their current value.
pub async fn update_farm(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<UpdateFarmRequest>,
) -> Result<Json<FarmResponse>, ApiErr> {
    let farm = owned_farm(&state, &id, &user.user_id)?;
    let name = nonempty(req.name);
    let address = nonempty(req.address);
    state
        .store
        .update_farm(&farm.id, name.as_deref(), address.as_deref())?;

    let updated = state
        .store
        .farm_by_id(&farm.id)?
        .ok_or_else(|| ApiErr::not_found("farm not found"))?;
    let count = state.store.count_animals(&farm.id)?;

    state.store.record_activity(&ActivityEntry::new(
        user.user_id,
        ActivityAction::FarmUpdate,
        Some(EntityType::Farm),
        Some(farm.id.clone()),
        None,
    ));

    Ok(Json(FarmResponse {
        farm: updated,
        animals_count: count.max(0) as u64,
    }))
}

// ---------------------------------------------------------------------------
// IRZ+ credentials
// ---------------------------------------------------------------------------

/// POST /api/farms/{id}/irz-credentials — link the keeper's registry
/// login. The password is sealed before it touches the database.
pub async fn set_irz_credentials(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<SetIrzCredentialsRequest>,
) -> Result<Json<OkMessage>, ApiErr> {
    owned_farm(&state, &id, &user.user_id)?;
    service::validate_irz_credentials(&req.irz_login, &req.irz_password)?;

    let sealed = crypto::seal(&state.config.seal_key, &req.irz_password)?;
    state
        .store
        .set_irz_credentials(&user.user_id, req.irz_login.trim(), &sealed)?;

    state.store.record_activity(&ActivityEntry::new(
        user.user_id,
        ActivityAction::FarmIrzConnect,
        Some(EntityType::Farm),
        Some(id),
        None,
    ));

    Ok(Json(OkMessage::new("IRZ+ credentials saved")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::{irz_credentials_for, testutil};
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn create_farm_rejects_mismatched_herd_number() {
        let (state, _dir) = testutil::state();
        let user = testutil::seed_user(&state);

        let err = create_farm(
            State(state.clone()),
            testutil::auth(&user),
            Json(CreateFarmRequest {
                producer_number: "071588967".into(),
                herd_number: "999999999-001".into(),
                name: None,
                address: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn farm_access_is_scoped_to_the_owner() {
        let (state, _dir) = testutil::state();
        let owner = testutil::seed_user(&state);
        let farm = testutil::seed_farm(&state, &owner);
        let outsider = testutil::seed_user(&state);

        let err = get_farm(
            State(state.clone()),
            testutil::auth(&outsider),
            Path(farm.id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::FORBIDDEN);

        let err = get_farm(
            State(state.clone()),
            testutil::auth(&owner),
            Path("no-such-farm".into()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn credentials_round_trip_through_the_seal() {
        let (state, _dir) = testutil::state();
        let user = testutil::seed_user(&state);
        let farm = testutil::seed_farm(&state, &user);

        set_irz_credentials(
            State(state.clone()),
            testutil::auth(&user),
            Path(farm.id.clone()),
            Json(SetIrzCredentialsRequest {
                irz_login: "keeper@example.pl".into(),
                irz_password: "sekretne-haslo".into(),
            }),
        )
        .await
        .unwrap();

        let creds = irz_credentials_for(&state, &user.id).unwrap();
        assert_eq!(creds.username, "keeper@example.pl");
        assert_eq!(creds.password, "sekretne-haslo");
    }
}
