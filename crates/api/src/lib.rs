//! Shared wire types for the herdbook API.
//!
//! This crate is the single source of truth for request/response shapes.
//! The `backend` feature adds the crypto helpers the server needs (token
//! signing, credential sealing); clients can depend on the types alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "backend")]
pub mod crypto;
pub mod service;

// Re-export domain records for convenience
pub use herdbook_core::domain::{
    ActivityAction, ActivityEntry, Animal, AnimalEvent, AnimalStatus, Document, DocumentStatus,
    DocumentType, Farm, Gender, Species, SyncDirection, SyncLog, SyncStatus, User,
};
pub use herdbook_core::report::{BirthReportForm, DeathReportForm, TransferReportForm};

// ─── Auth ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Returned once at provisioning time; the token is the caller's bearer
/// credential from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: String,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user_id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub has_irz_credentials: bool,
}

// ─── Farms ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFarmRequest {
    pub producer_number: String,
    pub herd_number: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFarmRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetIrzCredentialsRequest {
    pub irz_login: String,
    pub irz_password: String,
}

/// A farm plus the animal count shown in listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmResponse {
    #[serde(flatten)]
    pub farm: Farm,
    pub animals_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkMessage {
    pub message: String,
}

impl OkMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// ─── Animals ─────────────────────────────────────────────────────────────────

/// Query-string filters for animal listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalFilters {
    #[serde(default)]
    pub species: Option<Species>,
    #[serde(default)]
    pub status: Option<AnimalStatus>,
    /// Case-insensitive substring match over ear tag and breed.
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

impl AnimalFilters {
    /// Resolved `(page, page_size)` with defaults applied and the size
    /// clamped to [`MAX_PAGE_SIZE`].
    pub fn pagination(&self) -> (u32, u32) {
        let page = self.page.unwrap_or(1).max(1);
        let page_size = self
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        (page, page_size)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u64,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, page: u32, page_size: u32) -> Self {
        let total_pages = total.div_ceil(page_size.max(1) as u64);
        Self {
            items,
            total,
            page,
            page_size,
            total_pages,
        }
    }
}

/// Full animal view: the record plus its history and paperwork.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalDetailResponse {
    #[serde(flatten)]
    pub animal: Animal,
    pub events: Vec<AnimalEvent>,
    pub documents: Vec<Document>,
    pub farm: Farm,
}

// ─── Documents ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthReportCreated {
    pub document: Document,
    pub animal: Animal,
}

// ─── Sync ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSyncRequest {
    pub farm_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSyncResponse {
    pub job_id: String,
    pub status: SyncJobStatus,
}

/// Job-registry view of a sync. Unlike [`SyncStatus`] this includes the
/// "no such job" answer, which the status endpoint reports in-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncJobStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
    NotFound,
}

impl From<SyncStatus> for SyncJobStatus {
    fn from(s: SyncStatus) -> Self {
        match s {
            SyncStatus::Pending => Self::Pending,
            SyncStatus::InProgress => Self::InProgress,
            SyncStatus::Completed => Self::Completed,
            SyncStatus::Failed => Self::Failed,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatusResponse {
    pub job_id: String,
    pub status: SyncJobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities_synced: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncStatusResponse {
    pub fn not_found(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: SyncJobStatus::NotFound,
            progress: None,
            entities_synced: None,
            error_message: None,
            started_at: None,
            completed_at: None,
        }
    }
}

// ─── Dashboard ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeciesCount {
    pub species: Species,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub animals_count: u64,
    pub animals_by_species: Vec<SpeciesCount>,
    pub pending_documents: u64,
    pub submitted_documents: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecentItemKind {
    Sync,
    Document,
}

/// One row of the dashboard's merged recent-activity feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivityItem {
    pub kind: RecentItemKind,
    pub title: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderKind {
    Birth,
    Death,
    Transfer,
}

/// A deadline the keeper should act on, sorted most-urgent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub kind: ReminderKind,
    pub title: String,
    /// YYYY-MM-DD
    pub due_date: String,
    /// Negative once the deadline has passed.
    pub days_left: i64,
    pub entity_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLogQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

// ─── Registry read-throughs ──────────────────────────────────────────────────

/// Query-string filters for the live poultry-events view. Field names
/// mirror the registry's own filter vocabulary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoultryEventQuery {
    #[serde(default)]
    pub batch_number: Option<String>,
    #[serde(default)]
    pub species_code: Option<String>,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub date_from: Option<String>,
    #[serde(default)]
    pub date_to: Option<String>,
}

// ─── Misc ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Transport-agnostic service error; the server maps it onto HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl ServiceError {
    /// HTTP status code as a `u16`.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Unauthorized(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Internal(_) => 500,
        }
    }

    /// The error message.
    pub fn message(&self) -> &str {
        match self {
            Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::Conflict(m)
            | Self::Internal(m) => m,
        }
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.status_code(), self.message())
    }
}

impl std::error::Error for ServiceError {}
