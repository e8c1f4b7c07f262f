//! Typed report forms. A document snapshots the form it was created from
//! into `form_data`; these types define those snapshots.

use crate::domain::{DeathCause, DisposalMethod, Gender, Species, TransferDirection};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthReportForm {
    pub farm_id: String,
    pub ear_tag_number: String,
    pub species: Species,
    pub gender: Gender,
    /// YYYY-MM-DD
    pub birth_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_ear_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathReportForm {
    pub animal_id: String,
    /// YYYY-MM-DD
    pub death_date: String,
    pub death_cause: DeathCause,
    pub disposal_method: DisposalMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferReportForm {
    pub animal_id: String,
    /// YYYY-MM-DD
    pub transfer_date: String,
    pub direction: TransferDirection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_herd_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_herd_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// The form snapshot stored on a death report also carries the farm
/// numbers, so the ZPZU payload can be rebuilt at submit time without
/// another farm lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathReportSnapshot {
    #[serde(flatten)]
    pub form: DeathReportForm,
    pub ear_tag_number: String,
    pub producer_number: String,
    pub herd_number: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn death_snapshot_flattens_form_fields() {
        let snap = DeathReportSnapshot {
            form: DeathReportForm {
                animal_id: "a1".into(),
                death_date: "2025-03-01".into(),
                death_cause: DeathCause::Disease,
                disposal_method: DisposalMethod::RenderingPlant,
                notes: None,
            },
            ear_tag_number: "PL005123456789".into(),
            producer_number: "071588967".into(),
            herd_number: "071588967-001".into(),
        };
        let v = serde_json::to_value(&snap).unwrap();
        assert_eq!(v["deathCause"], "DISEASE");
        assert_eq!(v["earTagNumber"], "PL005123456789");

        let back: DeathReportSnapshot = serde_json::from_value(v).unwrap();
        assert_eq!(back.form.disposal_method, DisposalMethod::RenderingPlant);
    }
}
