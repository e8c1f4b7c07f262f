use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Raised when a stored or wire string does not match any enum variant.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

macro_rules! str_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(ParseEnumError::new($kind, other)),
                }
            }
        }
    };
}

/// Animal species recognized by the IRZ+ registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Species {
    Cattle,
    Sheep,
    Goat,
    Pig,
    Poultry,
    Horse,
    Deer,
    Camel,
}

str_enum!(Species, "species", {
    Cattle => "CATTLE",
    Sheep => "SHEEP",
    Goat => "GOAT",
    Pig => "PIG",
    Poultry => "POULTRY",
    Horse => "HORSE",
    Deer => "DEER",
    Camel => "CAMEL",
});

impl Species {
    /// Maps a registry species label (Polish, with or without diacritics)
    /// to a species. Unrecognized labels fall back to cattle, the dominant
    /// category in the individual-animal API.
    pub fn from_registry_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "bydlo" | "bydło" => Self::Cattle,
            "owce" => Self::Sheep,
            "kozy" => Self::Goat,
            "swinie" | "świnie" => Self::Pig,
            "drob" | "drób" => Self::Poultry,
            "koniowate" | "konie" => Self::Horse,
            "jelenie" => Self::Deer,
            "wielblady" | "wielbłądy" => Self::Camel,
            _ => Self::Cattle,
        }
    }

    /// Maps a registry species code (SIA dictionary) to a species.
    pub fn from_registry_code(code: &str) -> Self {
        match code.trim().to_uppercase().as_str() {
            "B" => Self::Cattle,
            "O" => Self::Sheep,
            "K" => Self::Goat,
            "J" => Self::Deer,
            "W" => Self::Camel,
            "S" => Self::Pig,
            "D" => Self::Poultry,
            "KO" => Self::Horse,
            _ => Self::Cattle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gender {
    Male,
    Female,
}

str_enum!(Gender, "gender", {
    Male => "MALE",
    Female => "FEMALE",
});

impl Gender {
    /// Maps a registry gender label to a gender. The registry mixes species
    /// terms (byk, knur, ogier) with generic ones; anything not recognized
    /// as male is treated as female, matching upstream data entry practice.
    pub fn from_registry_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "samiec" | "m" | "male" | "byk" | "buhaj" | "knur" | "tryk" | "cap" | "ogier" => {
                Self::Male
            }
            _ => Self::Female,
        }
    }

    /// Maps a registry gender code to a gender.
    pub fn from_registry_code(code: &str) -> Self {
        match code.trim().to_lowercase().as_str() {
            "o" | "w" | "m" | "1" => Self::Male,
            _ => Self::Female,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnimalStatus {
    Active,
    Deceased,
    Sold,
    Slaughtered,
}

str_enum!(AnimalStatus, "animal status", {
    Active => "ACTIVE",
    Deceased => "DECEASED",
    Sold => "SOLD",
    Slaughtered => "SLAUGHTERED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    BirthReport,
    DeathReport,
    TransferReport,
    SlaughterReport,
    DisposalReport,
}

str_enum!(DocumentType, "document type", {
    BirthReport => "BIRTH_REPORT",
    DeathReport => "DEATH_REPORT",
    TransferReport => "TRANSFER_REPORT",
    SlaughterReport => "SLAUGHTER_REPORT",
    DisposalReport => "DISPOSAL_REPORT",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Draft,
    Pending,
    Submitted,
    Accepted,
    Rejected,
    Error,
}

str_enum!(DocumentStatus, "document status", {
    Draft => "DRAFT",
    Pending => "PENDING",
    Submitted => "SUBMITTED",
    Accepted => "ACCEPTED",
    Rejected => "REJECTED",
    Error => "ERROR",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

str_enum!(SyncStatus, "sync status", {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Failed => "FAILED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncDirection {
    Pull,
    Push,
}

str_enum!(SyncDirection, "sync direction", {
    Pull => "PULL",
    Push => "PUSH",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeathCause {
    Natural,
    Disease,
    Accident,
    Euthanasia,
    Unknown,
}

str_enum!(DeathCause, "death cause", {
    Natural => "NATURAL",
    Disease => "DISEASE",
    Accident => "ACCIDENT",
    Euthanasia => "EUTHANASIA",
    Unknown => "UNKNOWN",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisposalMethod {
    RenderingPlant,
    Burial,
    Veterinary,
}

str_enum!(DisposalMethod, "disposal method", {
    RenderingPlant => "RENDERING_PLANT",
    Burial => "BURIAL",
    Veterinary => "VETERINARY",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferDirection {
    In,
    Out,
}

str_enum!(TransferDirection, "transfer direction", {
    In => "IN",
    Out => "OUT",
});

/// Lifecycle events recorded against an animal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Birth,
    Death,
    TransferIn,
    TransferOut,
    Slaughter,
    Sync,
}

str_enum!(EventType, "event type", {
    Birth => "BIRTH",
    Death => "DEATH",
    TransferIn => "TRANSFER_IN",
    TransferOut => "TRANSFER_OUT",
    Slaughter => "SLAUGHTER",
    Sync => "SYNC",
});

/// User-visible actions recorded in the activity log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Register,
    FarmCreate,
    FarmUpdate,
    FarmIrzConnect,
    AnimalCreate,
    AnimalUpdate,
    DocumentCreate,
    DocumentSubmit,
    SyncStart,
    SyncComplete,
    SyncFail,
}

str_enum!(ActivityAction, "activity action", {
    Register => "REGISTER",
    FarmCreate => "FARM_CREATE",
    FarmUpdate => "FARM_UPDATE",
    FarmIrzConnect => "FARM_IRZ_CONNECT",
    AnimalCreate => "ANIMAL_CREATE",
    AnimalUpdate => "ANIMAL_UPDATE",
    DocumentCreate => "DOCUMENT_CREATE",
    DocumentSubmit => "DOCUMENT_SUBMIT",
    SyncStart => "SYNC_START",
    SyncComplete => "SYNC_COMPLETE",
    SyncFail => "SYNC_FAIL",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    User,
    Farm,
    Animal,
    Document,
    Sync,
}

str_enum!(EntityType, "entity type", {
    User => "USER",
    Farm => "FARM",
    Animal => "ANIMAL",
    Document => "DOCUMENT",
    Sync => "SYNC",
});

/// An account holding farms. The IRZ+ login is stored here because the
/// registry identifies keepers, not holdings; the password itself lives
/// sealed in storage and never appears on this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irz_login: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, display_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            email,
            display_name,
            irz_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_irz_credentials(&self) -> bool {
        self.irz_login.is_some()
    }
}

/// A holding registered with ARiMR.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Farm {
    pub id: String,
    pub user_id: String,
    /// 9-digit keeper number used for all registry queries.
    pub producer_number: String,
    /// Producer number plus the 3-digit site suffix.
    pub herd_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_sync_at: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Farm {
    pub fn new(
        user_id: String,
        producer_number: String,
        herd_number: String,
        name: Option<String>,
        address: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            producer_number,
            herd_number,
            name,
            address,
            last_sync_at: None,
            sync_status: SyncStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One animal (or, for poultry and pig groups, one registry-keyed group
/// record) on a farm. `(farm_id, ear_tag_number)` is the natural key the
/// sync upsert works against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Animal {
    pub id: String,
    pub farm_id: String,
    /// Registry-side identifier, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irz_id: Option<String>,
    pub ear_tag_number: String,
    pub species: Species,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_ear_tag: Option<String>,
    pub status: AnimalStatus,
    /// Set every time a registry pull touches this row.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalEvent {
    pub id: String,
    pub animal_id: String,
    pub event_type: EventType,
    pub event_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AnimalEvent {
    pub fn new(
        animal_id: String,
        event_type: EventType,
        event_date: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            animal_id,
            event_type,
            event_date,
            description,
        }
    }
}

/// A regulatory report. `form_data` is the typed form snapshot taken at
/// creation time; `irz_response` is whatever the registry answered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    pub farm_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animal_id: Option<String>,
    pub doc_type: DocumentType,
    pub status: DocumentStatus,
    pub form_data: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irz_doc_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub irz_response: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new_draft(
        farm_id: String,
        animal_id: Option<String>,
        doc_type: DocumentType,
        form_data: serde_json::Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            farm_id,
            animal_id,
            doc_type,
            status: DocumentStatus::Draft,
            form_data,
            irz_doc_number: None,
            irz_response: None,
            submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Submission is allowed from the initial state and after a failed
    /// attempt, never for anything already on its way to the registry.
    pub fn can_submit(&self) -> bool {
        matches!(self.status, DocumentStatus::Draft | DocumentStatus::Error)
    }
}

/// One synchronization run against the registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLog {
    pub id: String,
    pub farm_id: String,
    pub direction: SyncDirection,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entities_synced: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl SyncLog {
    pub fn start_pull(farm_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            farm_id,
            direction: SyncDirection::Pull,
            status: SyncStatus::Pending,
            entities_synced: None,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEntry {
    pub id: String,
    pub user_id: String,
    pub action: ActivityAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type: Option<EntityType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl ActivityEntry {
    pub fn new(
        user_id: String,
        action: ActivityAction,
        entity_type: Option<EntityType>,
        entity_id: Option<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id,
            action,
            entity_type,
            entity_id,
            details,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_round_trips_through_storage_strings() {
        for s in [
            Species::Cattle,
            Species::Sheep,
            Species::Goat,
            Species::Pig,
            Species::Poultry,
            Species::Horse,
            Species::Deer,
            Species::Camel,
        ] {
            assert_eq!(s.as_str().parse::<Species>().unwrap(), s);
        }
        assert_eq!(
            "IN_PROGRESS".parse::<SyncStatus>().unwrap(),
            SyncStatus::InProgress
        );
        assert!("in_progress".parse::<SyncStatus>().is_err());
    }

    #[test]
    fn wire_format_is_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&DocumentType::BirthReport).unwrap(),
            "\"BIRTH_REPORT\""
        );
        let parsed: DocumentStatus = serde_json::from_str("\"DRAFT\"").unwrap();
        assert_eq!(parsed, DocumentStatus::Draft);
    }

    #[test]
    fn species_registry_names_cover_diacritic_variants() {
        assert_eq!(Species::from_registry_name("Bydło"), Species::Cattle);
        assert_eq!(Species::from_registry_name("bydlo"), Species::Cattle);
        assert_eq!(Species::from_registry_name("świnie"), Species::Pig);
        assert_eq!(Species::from_registry_name("swinie"), Species::Pig);
        assert_eq!(Species::from_registry_name("drób"), Species::Poultry);
        assert_eq!(Species::from_registry_name("konie"), Species::Horse);
        assert_eq!(Species::from_registry_name("wielbłądy"), Species::Camel);
        // unknown labels land on cattle
        assert_eq!(Species::from_registry_name("strusie"), Species::Cattle);
    }

    #[test]
    fn species_registry_codes() {
        assert_eq!(Species::from_registry_code("B"), Species::Cattle);
        assert_eq!(Species::from_registry_code("ko"), Species::Horse);
        assert_eq!(Species::from_registry_code("S"), Species::Pig);
        assert_eq!(Species::from_registry_code("X"), Species::Cattle);
    }

    #[test]
    fn gender_labels_include_species_terms() {
        for label in ["samiec", "M", "byk", "buhaj", "knur", "tryk", "cap", "ogier"] {
            assert_eq!(Gender::from_registry_label(label), Gender::Male, "{label}");
        }
        assert_eq!(Gender::from_registry_label("samica"), Gender::Female);
        assert_eq!(Gender::from_registry_label(""), Gender::Female);
        assert_eq!(Gender::from_registry_code("O"), Gender::Male);
        assert_eq!(Gender::from_registry_code("2"), Gender::Female);
    }

    #[test]
    fn document_submit_gate() {
        let mut doc = Document::new_draft(
            "farm".into(),
            None,
            DocumentType::DeathReport,
            serde_json::json!({}),
        );
        assert!(doc.can_submit());
        doc.status = DocumentStatus::Error;
        assert!(doc.can_submit());
        for blocked in [
            DocumentStatus::Pending,
            DocumentStatus::Submitted,
            DocumentStatus::Accepted,
            DocumentStatus::Rejected,
        ] {
            doc.status = blocked;
            assert!(!doc.can_submit());
        }
    }

    #[test]
    fn records_serialize_camel_case() {
        let farm = Farm::new(
            "u1".into(),
            "071588967".into(),
            "071588967-001".into(),
            Some("Gospodarstwo Kowalski".into()),
            None,
        );
        let v = serde_json::to_value(&farm).unwrap();
        assert_eq!(v["producerNumber"], "071588967");
        assert_eq!(v["syncStatus"], "PENDING");
        assert!(v.get("lastSyncAt").is_none());
        assert!(v.get("address").is_none());
    }
}
