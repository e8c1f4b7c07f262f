use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use tracing::warn;

use herdbook_api::BirthReportCreated;
use herdbook_core::domain::{
    ActivityAction, ActivityEntry, Animal, AnimalEvent, AnimalStatus, Document, DocumentType,
    EntityType, EventType, TransferDirection,
};
use herdbook_core::ident::{canonical_ear_tag, validate_ear_tag};
use herdbook_core::report::{
    BirthReportForm, DeathReportForm, DeathReportSnapshot, TransferReportForm,
};
use herdbook_registry::{DeathReport, SubmitOutcome};

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::routes::{irz_credentials_for, owned_farm};
use crate::AppState;

fn parse_report_date(value: &str) -> Result<NaiveDate, ApiErr> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiErr::bad_request("dates must be YYYY-MM-DD"))
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

/// GET /api/documents/farm/{farm_id} — all documents for a farm, newest first.
pub async fn list_farm_documents(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farm_id): Path<String>,
) -> Result<Json<Vec<Document>>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;
    Ok(Json(state.store.documents_by_farm(&farm.id)?))
}

/// GET /api/documents/{id} — one document.
pub async fn get_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiErr> {
    let doc = state
        .store
        .document_by_id(&id)?
        .ok_or_else(|| ApiErr::not_found("document not found"))?;
    owned_farm(&state, &doc.farm_id, &user.user_id)?;
    Ok(Json(doc))
}

// ---------------------------------------------------------------------------
// Birth report
// ---------------------------------------------------------------------------

/// POST /api/documents/birth-report — draft the report and register the
/// newborn locally in one step.
pub async fn create_birth_report(
    State(state): State<AppState>,
    user: AuthUser,
    Json(form): Json<BirthReportForm>,
) -> Result<(StatusCode, Json<BirthReportCreated>), ApiErr> {
    let farm = owned_farm(&state, &form.farm_id, &user.user_id)?;

    let ear_tag = canonical_ear_tag(&form.ear_tag_number);
    validate_ear_tag(&ear_tag).map_err(|e| ApiErr::bad_request(e.to_string()))?;
    parse_report_date(&form.birth_date)?;

    let now = Utc::now();
    let animal = Animal {
        id: uuid::Uuid::new_v4().to_string(),
        farm_id: farm.id.clone(),
        irz_id: None,
        ear_tag_number: ear_tag.clone(),
        species: form.species,
        breed: form.breed.clone(),
        gender: form.gender,
        birth_date: Some(form.birth_date.clone()),
        mother_ear_tag: form.mother_ear_tag.clone(),
        status: AnimalStatus::Active,
        synced_at: None,
        created_at: now,
        updated_at: now,
    };
    state.store.insert_animal(&animal).map_err(|e| match e {
        herdbook_store::StoreError::Duplicate => {
            ApiErr::conflict("an animal with this ear tag already exists on the farm")
        }
        other => ApiErr::from(other),
    })?;

    // The stored snapshot carries the canonical tag, not what was typed.
    let mut snapshot = form.clone();
    snapshot.ear_tag_number = ear_tag.clone();
    let form_data =
        serde_json::to_value(&snapshot).map_err(ApiErr::from_db("encode birth report form"))?;
    let document = Document::new_draft(
        farm.id.clone(),
        Some(animal.id.clone()),
        DocumentType::BirthReport,
        form_data,
    );
    state.store.insert_document(&document)?;

    let description = match form.mother_ear_tag.as_deref() {
        Some(tag) => format!("mother: {tag}"),
        None => "mother: unknown".to_string(),
    };
    state.store.insert_event(&AnimalEvent::new(
        animal.id.clone(),
        EventType::Birth,
        form.birth_date.clone(),
        Some(description),
    ))?;

    state.store.record_activity(&ActivityEntry::new(
        user.user_id.clone(),
        ActivityAction::AnimalCreate,
        Some(EntityType::Animal),
        Some(animal.id.clone()),
        Some(serde_json::json!({"earTagNumber": ear_tag})),
    ));
    state.store.record_activity(&ActivityEntry::new(
        user.user_id,
        ActivityAction::DocumentCreate,
        Some(EntityType::Document),
        Some(document.id.clone()),
        Some(serde_json::json!({"docType": document.doc_type})),
    ));

    Ok((
        StatusCode::CREATED,
        Json(BirthReportCreated { document, animal }),
    ))
}

// ---------------------------------------------------------------------------
// Death report
// ---------------------------------------------------------------------------

/// POST /api/documents/death-report — draft a ZPZU report and mark the
/// animal deceased.
pub async fn create_death_report(
    State(state): State<AppState>,
    user: AuthUser,
    Json(form): Json<DeathReportForm>,
) -> Result<(StatusCode, Json<Document>), ApiErr> {
    let animal = state
        .store
        .animal_by_id(&form.animal_id)?
        .ok_or_else(|| ApiErr::not_found("animal not found"))?;
    let farm = owned_farm(&state, &animal.farm_id, &user.user_id)?;
    parse_report_date(&form.death_date)?;

    // The snapshot carries the farm numbers so submission can build the
    // ZPZU payload without loading the farm again.
    let snapshot = DeathReportSnapshot {
        form: form.clone(),
        ear_tag_number: animal.ear_tag_number.clone(),
        producer_number: farm.producer_number.clone(),
        herd_number: farm.herd_number.clone(),
    };
    let form_data =
        serde_json::to_value(&snapshot).map_err(ApiErr::from_db("encode death report form"))?;
    let document = Document::new_draft(
        farm.id.clone(),
        Some(animal.id.clone()),
        DocumentType::DeathReport,
        form_data,
    );
    state.store.insert_document(&document)?;

    state
        .store
        .set_animal_status(&animal.id, AnimalStatus::Deceased)?;
    state.store.insert_event(&AnimalEvent::new(
        animal.id.clone(),
        EventType::Death,
        form.death_date.clone(),
        Some(format!("cause: {}", form.death_cause)),
    ))?;

    state.store.record_activity(&ActivityEntry::new(
        user.user_id,
        ActivityAction::DocumentCreate,
        Some(EntityType::Document),
        Some(document.id.clone()),
        Some(serde_json::json!({"docType": document.doc_type})),
    ));

    Ok((StatusCode::CREATED, Json(document)))
}

// ---------------------------------------------------------------------------
// Transfer report
// ---------------------------------------------------------------------------

/// POST /api/documents/transfer-report — draft a movement report. An
/// outbound transfer also marks the animal sold.
pub async fn create_transfer_report(
    State(state): State<AppState>,
    user: AuthUser,
    Json(form): Json<TransferReportForm>,
) -> Result<(StatusCode, Json<Document>), ApiErr> {
    let animal = state
        .store
        .animal_by_id(&form.animal_id)?
        .ok_or_else(|| ApiErr::not_found("animal not found"))?;
    let farm = owned_farm(&state, &animal.farm_id, &user.user_id)?;
    parse_report_date(&form.transfer_date)?;

    let form_data =
        serde_json::to_value(&form).map_err(ApiErr::from_db("encode transfer report form"))?;
    let document = Document::new_draft(
        farm.id.clone(),
        Some(animal.id.clone()),
        DocumentType::TransferReport,
        form_data,
    );
    state.store.insert_document(&document)?;

    let (event_type, description) = match form.direction {
        TransferDirection::Out => {
            state.store.set_animal_status(&animal.id, AnimalStatus::Sold)?;
            (
                EventType::TransferOut,
                form.destination_herd_number
                    .as_deref()
                    .map(|h| format!("to herd {h}")),
            )
        }
        TransferDirection::In => (
            EventType::TransferIn,
            form.source_herd_number
                .as_deref()
                .map(|h| format!("from herd {h}")),
        ),
    };
    state.store.insert_event(&AnimalEvent::new(
        animal.id.clone(),
        event_type,
        form.transfer_date.clone(),
        description,
    ))?;

    state.store.record_activity(&ActivityEntry::new(
        user.user_id,
        ActivityAction::DocumentCreate,
        Some(EntityType::Document),
        Some(document.id.clone()),
        Some(serde_json::json!({"docType": document.doc_type})),
    ));

    Ok((StatusCode::CREATED, Json(document)))
}

// ---------------------------------------------------------------------------
// Submit
// ---------------------------------------------------------------------------

fn local_document_number() -> String {
    let now = Utc::now();
    format!("ZPZU/{}/{}", now.format("%Y"), now.timestamp_millis())
}

/// POST /api/documents/{id}/submit — file the report with the registry.
///
/// Only death reports have a live submission endpoint; the other types
/// are registered locally under a generated document number. Registry
/// trouble is recorded on the document rather than surfaced as an HTTP
/// error: the caller gets the document back and reads its status.
pub async fn submit_document(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<Document>, ApiErr> {
    let document = state
        .store
        .document_by_id(&id)?
        .ok_or_else(|| ApiErr::not_found("document not found"))?;
    owned_farm(&state, &document.farm_id, &user.user_id)?;

    if !document.can_submit() {
        return Err(ApiErr::bad_request("document already submitted"));
    }

    let outcome = match document.doc_type {
        DocumentType::DeathReport => {
            let snapshot: DeathReportSnapshot =
                serde_json::from_value(document.form_data.clone()).map_err(|e| {
                    tracing::error!("document {id}: malformed form snapshot: {e}");
                    ApiErr::internal("malformed document form data")
                })?;
            // Resolve credentials before claiming the document, so a
            // missing login does not leave it stuck in PENDING.
            let creds = irz_credentials_for(&state, &user.user_id)?;
            state.store.set_document_pending(&id)?;

            let report = DeathReport {
                ear_tag_number: snapshot.ear_tag_number,
                death_date: snapshot.form.death_date,
                death_cause: snapshot.form.death_cause,
                disposal_method: snapshot.form.disposal_method,
                producer_number: snapshot.producer_number,
            };
            match state.registry.submit_death_report(&creds, &report).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("document {id}: registry submission failed: {e}");
                    SubmitOutcome {
                        success: false,
                        document_number: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        }
        _ => SubmitOutcome {
            success: true,
            document_number: Some(local_document_number()),
            error: None,
        },
    };

    let response = serde_json::to_value(&outcome).ok();
    if outcome.success {
        let number = outcome
            .document_number
            .clone()
            .unwrap_or_else(local_document_number);
        state
            .store
            .mark_document_submitted(&id, &number, response.as_ref())?;
        state.store.record_activity(&ActivityEntry::new(
            user.user_id,
            ActivityAction::DocumentSubmit,
            Some(EntityType::Document),
            Some(id.clone()),
            Some(serde_json::json!({"irzDocNumber": number})),
        ));
    } else {
        state.store.mark_document_error(&id, response.as_ref())?;
    }

    let updated = state
        .store
        .document_by_id(&id)?
        .ok_or_else(|| ApiErr::not_found("document not found"))?;
    Ok(Json(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testutil;
    use axum::response::IntoResponse;
    use herdbook_core::domain::{DeathCause, DisposalMethod, DocumentStatus, Farm, Gender, Species};

    fn birth_form(farm: &Farm, ear_tag: &str) -> BirthReportForm {
        BirthReportForm {
            farm_id: farm.id.clone(),
            ear_tag_number: ear_tag.into(),
            species: Species::Cattle,
            gender: Gender::Female,
            birth_date: "2025-03-01".into(),
            mother_ear_tag: Some("PL005123456000".into()),
            breed: None,
        }
    }

    #[tokio::test]
    async fn birth_report_registers_newborn_and_drafts_document() {
        let (state, _dir) = testutil::state();
        let user = testutil::seed_user(&state);
        let farm = testutil::seed_farm(&state, &user);

        let (status, created) = create_birth_report(
            State(state.clone()),
            testutil::auth(&user),
            Json(birth_form(&farm, " pl005123456789 ")),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.0.animal.ear_tag_number, "PL005123456789");
        assert_eq!(created.0.animal.status, AnimalStatus::Active);
        assert_eq!(created.0.document.status, DocumentStatus::Draft);
        assert_eq!(created.0.document.form_data["earTagNumber"], "PL005123456789");

        let events = state.store.events_by_animal(&created.0.animal.id).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, EventType::Birth);
        assert_eq!(events[0].description.as_deref(), Some("mother: PL005123456000"));
    }

    #[tokio::test]
    async fn duplicate_ear_tag_on_a_farm_is_a_conflict() {
        let (state, _dir) = testutil::state();
        let user = testutil::seed_user(&state);
        let farm = testutil::seed_farm(&state, &user);

        create_birth_report(
            State(state.clone()),
            testutil::auth(&user),
            Json(birth_form(&farm, "PL005123456789")),
        )
        .await
        .unwrap();

        let err = create_birth_report(
            State(state.clone()),
            testutil::auth(&user),
            Json(birth_form(&farm, "pl005123456789")),
        )
        .await
        .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn submitting_a_birth_report_registers_it_locally() {
        let (state, _dir) = testutil::state();
        let user = testutil::seed_user(&state);
        let farm = testutil::seed_farm(&state, &user);

        let (_, created) = create_birth_report(
            State(state.clone()),
            testutil::auth(&user),
            Json(birth_form(&farm, "PL005123456789")),
        )
        .await
        .unwrap();
        let doc_id = created.0.document.id.clone();

        let submitted = submit_document(
            State(state.clone()),
            testutil::auth(&user),
            Path(doc_id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(submitted.0.status, DocumentStatus::Submitted);
        let number = submitted.0.irz_doc_number.unwrap();
        assert!(number.starts_with("ZPZU/"), "got {number}");

        let err = submit_document(State(state.clone()), testutil::auth(&user), Path(doc_id))
            .await
            .unwrap_err();
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn death_report_marks_animal_deceased() {
        let (state, _dir) = testutil::state();
        let user = testutil::seed_user(&state);
        let farm = testutil::seed_farm(&state, &user);

        let (_, created) = create_birth_report(
            State(state.clone()),
            testutil::auth(&user),
            Json(birth_form(&farm, "PL005123456789")),
        )
        .await
        .unwrap();
        let animal_id = created.0.animal.id.clone();

        let (status, doc) = create_death_report(
            State(state.clone()),
            testutil::auth(&user),
            Json(DeathReportForm {
                animal_id: animal_id.clone(),
                death_date: "2025-04-02".into(),
                death_cause: DeathCause::Disease,
                disposal_method: DisposalMethod::RenderingPlant,
                notes: None,
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(doc.0.status, DocumentStatus::Draft);
        assert_eq!(doc.0.form_data["producerNumber"], farm.producer_number);
        assert_eq!(doc.0.form_data["earTagNumber"], "PL005123456789");

        let animal = state.store.animal_by_id(&animal_id).unwrap().unwrap();
        assert_eq!(animal.status, AnimalStatus::Deceased);

        let events = state.store.events_by_animal(&animal_id).unwrap();
        assert!(events.iter().any(|e| e.event_type == EventType::Death));
    }
}
