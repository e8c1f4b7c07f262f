//! Raw IRZ+ wire shapes. Field names follow the upstream OpenAPI documents
//! verbatim (Polish, camelCase); [`crate::normalize`] turns these into the
//! unified records the rest of the system works with.

use serde::{Deserialize, Serialize};

/// Dictionary value: a SIA code plus its human-readable description.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KodOpis {
    pub kod: Option<String>,
    pub opis: Option<String>,
}

// ── Individual animals (cattle, sheep, goats, deer, camels) ─────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalRecord {
    pub numer_identyfikacyjny: Option<String>,
    pub numer_kolczyka: Option<String>,
    pub gatunek: Option<String>,
    pub rasa: Option<String>,
    pub plec: Option<String>,
    pub data_urodzenia: Option<String>,
    pub numer_matki_kolczyk: Option<String>,
}

/// The list endpoints disagree on the wrapper key; both occur in the wild.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimalsEnvelope {
    pub dane: Option<Vec<AnimalRecord>>,
    pub lista_zwierzat: Option<Vec<AnimalRecord>>,
}

impl AnimalsEnvelope {
    pub fn into_records(self) -> Vec<AnimalRecord> {
        self.dane.or(self.lista_zwierzat).unwrap_or_default()
    }
}

/// Detail view of one individual animal (OpenAPI "indywidualne").
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualDetailsRecord {
    pub komunikat: Option<String>,
    pub numer_identyfikacyjny_zwierzecia: Option<String>,
    pub gatunek: Option<KodOpis>,
    pub data_urodzenia: Option<String>,
    pub plec: Option<KodOpis>,
    pub kod_rasy: Option<KodOpis>,
    pub czy_matka: Option<bool>,
    pub data_wyrejestrowania: Option<String>,
    pub masa_ciala_zwierzecia: Option<f64>,
    pub masa_tuszy: Option<f64>,
    pub numer_dzialalnosci: Option<String>,
    pub sposob_oznakowania: Option<String>,
    #[serde(rename = "informacjaOOswiadczeniuDDS")]
    pub informacja_o_oswiadczeniu_dds: Option<String>,
}

// ── Equines ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransponderEntry {
    pub numer_kod_transpondera: Option<String>,
    pub data_obowiazywania_od: Option<String>,
    pub data_obowiazywania_do: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorseDetailsRecord {
    pub rasa: Option<KodOpis>,
    pub typ_rasowy: Option<KodOpis>,
    pub niepowtarzalny_dozywotni_numer_ueln_matki: Option<String>,
    pub nazwa_matki: Option<String>,
    pub niepowtarzalny_dozywotni_numer_ueln_ojca_dawcy_nasienia: Option<String>,
    pub nazwa_ojca_lub_dawcy_nasienia: Option<String>,
    pub numer_kod_transpondera: Option<String>,
    pub miejsce_wszczepienia_transpondera: Option<String>,
    pub miejsce_urodzenia: Option<String>,
    pub kod_kraju_urodzenia: Option<KodOpis>,
    pub kastracja: Option<bool>,
    pub data_kastracji: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorseRecord {
    pub lp: Option<u64>,
    pub id_koniowatego: Option<i64>,
    /// UELN, the lifetime identifier equines carry instead of an ear tag.
    pub niepowtarzalny_dozywotni_numer: Option<String>,
    pub imie_nazwa_koniowatego: Option<String>,
    pub data_urodzenia: Option<String>,
    pub gatunek: Option<KodOpis>,
    pub plec: Option<KodOpis>,
    pub masc: Option<KodOpis>,
    pub numer_dzialalnosci: Option<String>,
    pub kraj_pochodzenia: Option<KodOpis>,
    pub szczegoly_zwierze_koniowate: Option<HorseDetailsRecord>,
    pub historia_kodow_transpondera: Option<Vec<TransponderEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HorsesEnvelope {
    pub komunikat: Option<String>,
    // Upstream spells this one with a trailing 'a'.
    pub lista_zwierzeta: Option<Vec<HorseRecord>>,
}

// ── Poultry ─────────────────────────────────────────────────────────────────

/// Poultry is registered as batches, not individual birds.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoultryBatchRecord {
    pub numer_partii_drobiu: Option<String>,
    pub gatunek: Option<KodOpis>,
    pub liczba_sztuk_drobiu: Option<u64>,
    pub liczba_sztuk_jaj_wylegowych: Option<u64>,
    pub numer_dzialalnosci: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoultryEnvelope {
    pub komunikat: Option<String>,
    pub dane: Option<Vec<PoultryBatchRecord>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntry {
    pub kod_bledu: Option<String>,
    pub komunikat: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoultryEventRecord {
    pub lp: Option<u64>,
    pub numer_partii_drobiu: Option<String>,
    pub gatunek: Option<KodOpis>,
    pub liczba_sztuk_drobiu: Option<u64>,
    pub liczba_sztuk_jaj_wylegowych: Option<u64>,
    pub typ_zdarzenia: Option<KodOpis>,
    pub stan_zdarzenia: Option<KodOpis>,
    pub data_zdarzenia: Option<String>,
    pub numer_dzialalnosci_zglaszajacej: Option<String>,
    pub numer_dzialalnosci_komplementarnej: Option<String>,
    pub uuid: Option<String>,
    pub blad: Option<Vec<ErrorEntry>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoultryEventsEnvelope {
    pub komunikat: Option<String>,
    // Singular upstream, unlike the equine list.
    pub lista_zdarzenie: Option<Vec<PoultryEventRecord>>,
}

// ── Pig herds ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SowId {
    pub indywidualny_numer_identyfikacyjny_lochy: Option<String>,
}

/// Herd-state record: pigs are registered per holding, with counts and
/// only sows identified individually.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PigHerdRecord {
    pub numer_dzialalnosci: Option<String>,
    pub liczba_swin: Option<u64>,
    pub liczba_swin_oznakowanych: Option<u64>,
    pub liczba_swin_nieoznakowanych: Option<u64>,
    pub technologia_produkcji: Option<Vec<KodOpis>>,
    pub system_utrzymania_swin: Option<Vec<KodOpis>>,
    pub numery_lochy: Option<Vec<SowId>>,
    pub data_zdarzenia: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PigHerdEnvelope {
    pub komunikat: Option<String>,
    pub dane: Option<Vec<PigHerdRecord>>,
}

// ── SSO ─────────────────────────────────────────────────────────────────────

/// Keycloak token grant response (snake_case, unlike the data API).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    pub token_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SsoErrorBody {
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// ── Document submission ─────────────────────────────────────────────────────

/// ZPZU death/disposal report payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathReportPayload {
    pub numer_kolczyka: String,
    pub data_padniecia: String,
    pub przyczyna_padniecia: String,
    pub sposob_utylizacji: String,
    pub numer_producenta: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub komunikat: Option<String>,
    pub bledy: Option<Vec<ErrorEntry>>,
    pub numer_dokumentu: Option<String>,
}

impl SubmissionResponse {
    /// Flattens upstream error entries into one message.
    pub fn error_summary(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();
        if let Some(msg) = self.komunikat.as_deref().filter(|m| !m.is_empty()) {
            parts.push(msg.to_string());
        }
        for e in self.bledy.iter().flatten() {
            match (&e.kod_bledu, &e.komunikat) {
                (Some(code), Some(msg)) => parts.push(format!("{code}: {msg}")),
                (None, Some(msg)) => parts.push(msg.clone()),
                (Some(code), None) => parts.push(code.clone()),
                (None, None) => {}
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("; "))
        }
    }
}
