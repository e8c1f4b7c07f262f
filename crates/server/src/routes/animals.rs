use axum::{
    extract::{Path, Query, State},
    Json,
};

use herdbook_api::{Animal, AnimalDetailResponse, AnimalFilters, Paginated};
use herdbook_core::domain::Species;
use herdbook_registry::IndividualDetails;
use herdbook_store::AnimalQuery;

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::routes::{irz_credentials_for, owned_farm};
use crate::AppState;

fn to_query(filters: &AnimalFilters) -> AnimalQuery {
    let (page, page_size) = filters.pagination();
    AnimalQuery {
        species: filters.species,
        status: filters.status,
        search: filters.search.clone(),
        limit: page_size as i64,
        offset: ((page - 1) * page_size) as i64,
    }
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// GET /api/animals/farm/{farm_id} — paged herd listing with filters.
pub async fn list_farm_animals(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farm_id): Path<String>,
    Query(filters): Query<AnimalFilters>,
) -> Result<Json<Paginated<Animal>>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;
    let (page, page_size) = filters.pagination();
    let (items, total) = state.store.list_animals(&farm.id, &to_query(&filters))?;
    Ok(Json(Paginated::new(items, total, page, page_size)))
}

/// GET /api/animals/farm/{farm_id}/species/{species} — same listing,
/// pinned to one species from the path.
pub async fn list_farm_animals_by_species(
    State(state): State<AppState>,
    user: AuthUser,
    Path((farm_id, species)): Path<(String, String)>,
    Query(filters): Query<AnimalFilters>,
) -> Result<Json<Paginated<Animal>>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;
    let species: Species = species
        .to_uppercase()
        .parse()
        .map_err(|_| ApiErr::bad_request("unknown species"))?;

    let (page, page_size) = filters.pagination();
    let mut query = to_query(&filters);
    query.species = Some(species);
    let (items, total) = state.store.list_animals(&farm.id, &query)?;
    Ok(Json(Paginated::new(items, total, page, page_size)))
}

// ---------------------------------------------------------------------------
// Detail
// ---------------------------------------------------------------------------

/// GET /api/animals/{id} — the record plus its event history, paperwork,
/// and the owning farm.
pub async fn get_animal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<AnimalDetailResponse>, ApiErr> {
    let animal = state
        .store
        .animal_by_id(&id)?
        .ok_or_else(|| ApiErr::not_found("animal not found"))?;
    let farm = owned_farm(&state, &animal.farm_id, &user.user_id)?;

    let events = state.store.events_by_animal(&animal.id)?;
    let documents = state.store.documents_by_animal(&animal.id)?;

    Ok(Json(AnimalDetailResponse {
        animal,
        events,
        documents,
        farm,
    }))
}

/// GET /api/animals/{id}/registry — live detail straight from IRZ+,
/// looked up by ear tag.
pub async fn get_animal_registry(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<IndividualDetails>, ApiErr> {
    let animal = state
        .store
        .animal_by_id(&id)?
        .ok_or_else(|| ApiErr::not_found("animal not found"))?;
    owned_farm(&state, &animal.farm_id, &user.user_id)?;

    let creds = irz_credentials_for(&state, &user.user_id)?;
    let details = state
        .registry
        .fetch_individual_details(&creds, &animal.ear_tag_number)
        .await?
        .ok_or_else(|| ApiErr::not_found("animal not found in the registry"))?;

    Ok(Json(details))
}
