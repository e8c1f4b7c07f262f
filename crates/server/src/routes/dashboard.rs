//! Dashboard aggregations: herd stats, a merged recent-activity feed,
//! and reminders derived from the seven-day reporting duty.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{Duration, NaiveDate, Utc};

use herdbook_api::{
    ActivityLogQuery, DashboardStats, RecentActivityItem, RecentItemKind, Reminder, ReminderKind,
    SpeciesCount,
};
use herdbook_core::domain::{ActivityEntry, Document, DocumentStatus, DocumentType};

use crate::error::ApiErr;
use crate::routes::auth::AuthUser;
use crate::routes::owned_farm;
use crate::AppState;

/// Statutory window for reporting births, deaths, and movements.
const REPORT_WINDOW_DAYS: i64 = 7;

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// GET /api/dashboard/stats/{farm_id} — headline numbers for one farm.
pub async fn stats(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farm_id): Path<String>,
) -> Result<Json<DashboardStats>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;

    let animals_count = state.store.count_active_animals(&farm.id)?;
    let by_species = state.store.animals_by_species(&farm.id)?;
    let pending = state
        .store
        .count_documents_with_status(&farm.id, DocumentStatus::Draft)?;
    let submitted = state
        .store
        .count_documents_with_status(&farm.id, DocumentStatus::Submitted)?;

    Ok(Json(DashboardStats {
        animals_count: animals_count.max(0) as u64,
        animals_by_species: by_species
            .into_iter()
            .map(|(species, count)| SpeciesCount {
                species,
                count: count.max(0) as u64,
            })
            .collect(),
        pending_documents: pending.max(0) as u64,
        submitted_documents: submitted.max(0) as u64,
        last_sync_at: farm.last_sync_at,
        sync_status: farm.sync_status,
    }))
}

// ---------------------------------------------------------------------------
// Recent activity
// ---------------------------------------------------------------------------

fn doc_label(doc_type: DocumentType) -> &'static str {
    match doc_type {
        DocumentType::BirthReport => "Birth report",
        DocumentType::DeathReport => "Death report",
        DocumentType::TransferReport => "Transfer report",
        DocumentType::SlaughterReport => "Slaughter report",
        DocumentType::DisposalReport => "Disposal report",
    }
}

/// GET /api/dashboard/activity/{farm_id} — the last syncs and documents,
/// merged into one feed, newest first.
pub async fn recent_activity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farm_id): Path<String>,
) -> Result<Json<Vec<RecentActivityItem>>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;

    let mut items: Vec<RecentActivityItem> = Vec::new();
    for log in state.store.sync_logs_by_farm(&farm.id, 5)? {
        items.push(RecentActivityItem {
            kind: RecentItemKind::Sync,
            title: match log.entities_synced {
                Some(n) => format!("Registry sync ({n} animals)"),
                None => "Registry sync".to_string(),
            },
            status: log.status.as_str().to_string(),
            timestamp: log.started_at,
        });
    }

    let mut documents = state.store.documents_by_farm(&farm.id)?;
    documents.truncate(5);
    for doc in documents {
        items.push(RecentActivityItem {
            kind: RecentItemKind::Document,
            title: doc_label(doc.doc_type).to_string(),
            status: doc.status.as_str().to_string(),
            timestamp: doc.created_at,
        });
    }

    items.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    items.truncate(10);
    Ok(Json(items))
}

// ---------------------------------------------------------------------------
// Reminders
// ---------------------------------------------------------------------------

fn draft_title(verb: &str, doc: &Document) -> String {
    match doc.form_data.get("earTagNumber").and_then(|v| v.as_str()) {
        Some(tag) => format!("{verb} for {tag}"),
        None => verb.to_string(),
    }
}

/// GET /api/dashboard/reminders/{farm_id} — reporting deadlines, most
/// urgent first.
///
/// Newborns must be reported within seven days of birth; death and
/// transfer drafts inherit the same window from their creation date.
pub async fn reminders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(farm_id): Path<String>,
) -> Result<Json<Vec<Reminder>>, ApiErr> {
    let farm = owned_farm(&state, &farm_id, &user.user_id)?;
    let now = Utc::now();
    let today = now.date_naive();
    let mut reminders = Vec::new();

    // Newborns with no birth report yet. Look back two windows so a
    // just-missed deadline still shows as overdue.
    let since = (today - Duration::days(2 * REPORT_WINDOW_DAYS))
        .format("%Y-%m-%d")
        .to_string();
    for animal in state
        .store
        .animals_born_since_without_birth_report(&farm.id, &since)?
    {
        let Some(birth_date) = animal.birth_date.as_deref() else {
            continue;
        };
        let Ok(born) = NaiveDate::parse_from_str(birth_date, "%Y-%m-%d") else {
            continue;
        };
        let due = born + Duration::days(REPORT_WINDOW_DAYS);
        let days_left = (due - today).num_days();
        if (-REPORT_WINDOW_DAYS..=REPORT_WINDOW_DAYS).contains(&days_left) {
            reminders.push(Reminder {
                kind: ReminderKind::Birth,
                title: format!("Report birth of {}", animal.ear_tag_number),
                due_date: due.format("%Y-%m-%d").to_string(),
                days_left,
                entity_id: animal.id,
            });
        }
    }

    // Death drafts sitting unsubmitted for more than three days.
    for doc in state
        .store
        .draft_documents_of_type(&farm.id, DocumentType::DeathReport)?
    {
        let age_days = (now - doc.created_at).num_days();
        if age_days <= 3 {
            continue;
        }
        let due = (doc.created_at + Duration::days(REPORT_WINDOW_DAYS)).date_naive();
        reminders.push(Reminder {
            kind: ReminderKind::Death,
            title: draft_title("Submit death report", &doc),
            due_date: due.format("%Y-%m-%d").to_string(),
            days_left: REPORT_WINDOW_DAYS - age_days,
            entity_id: doc.id,
        });
    }

    // Every transfer draft, regardless of age.
    for doc in state
        .store
        .draft_documents_of_type(&farm.id, DocumentType::TransferReport)?
    {
        let age_days = (now - doc.created_at).num_days();
        let due = (doc.created_at + Duration::days(REPORT_WINDOW_DAYS)).date_naive();
        reminders.push(Reminder {
            kind: ReminderKind::Transfer,
            title: draft_title("Submit transfer report", &doc),
            due_date: due.format("%Y-%m-%d").to_string(),
            days_left: REPORT_WINDOW_DAYS - age_days,
            entity_id: doc.id,
        });
    }

    reminders.sort_by_key(|r| r.days_left);
    Ok(Json(reminders))
}

// ---------------------------------------------------------------------------
// Activity log
// ---------------------------------------------------------------------------

/// GET /api/dashboard/activity-logs — the caller's audit trail.
pub async fn activity_logs(
    State(state): State<AppState>,
    user: AuthUser,
    Query(q): Query<ActivityLogQuery>,
) -> Result<Json<Vec<ActivityEntry>>, ApiErr> {
    let limit = q.limit.unwrap_or(50).clamp(1, 200) as i64;
    Ok(Json(state.store.activity_by_user(&user.user_id, limit)?))
}
