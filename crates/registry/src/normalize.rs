//! Folds the four upstream shapes (individual animals, pig herds, poultry
//! batches, equines) into one unified animal record, plus richer views where
//! a category carries data the unified shape cannot hold.
//!
//! Normalizers are total: a missing upstream field degrades to `None` or a
//! default, never to an error. Records that end up without an identifier are
//! dropped at upsert time, not here.

use herdbook_core::{Gender, Species};
use serde::Serialize;

use crate::types::{
    AnimalRecord, HorseRecord, IndividualDetailsRecord, KodOpis, PigHerdRecord,
    PoultryBatchRecord, PoultryEventRecord,
};

/// One animal, whatever category it came from.
///
/// For equines the ear-tag slot carries the UELN; for poultry batches it
/// carries the batch number and `group_count` holds the head count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedAnimal {
    pub irz_id: String,
    pub ear_tag_number: String,
    pub species: Species,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed: Option<String>,
    pub gender: Gender,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mother_ear_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub herd_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_count: Option<u64>,
}

/// Detail view of a single registered animal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndividualDetails {
    #[serde(flatten)]
    pub animal: NormalizedAnimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender_name: Option<String>,
    pub was_mother: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deregistration_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carcass_weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marking_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dds_statement: Option<String>,
}

/// Equine record; UELN doubles as the ear-tag slot of the embedded animal.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Horse {
    #[serde(flatten)]
    pub animal: NormalizedAnimal,
    pub ueln: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breed_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transponder_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_ueln: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub father_name: Option<String>,
    pub is_castrated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub castration_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_of_origin: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoultryBatch {
    pub batch_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_name: Option<String>,
    pub poultry_count: u64,
    pub hatching_eggs_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_number: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoultryEventError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoultryEvent {
    pub id: String,
    pub batch_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub species_name: Option<String>,
    pub poultry_count: u64,
    pub hatching_eggs_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_status_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reporting_activity_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub complementary_activity_number: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<PoultryEventError>,
}

/// Herd-level pig stock: totals plus the individually numbered sows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PigHerd {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_number: Option<String>,
    pub total_pigs: u64,
    pub tagged_pigs: u64,
    pub untagged_pigs: u64,
    pub production_technologies: Vec<String>,
    pub keeping_systems: Vec<String>,
    pub sow_numbers: Vec<String>,
}

fn opis(pair: &Option<KodOpis>) -> Option<String> {
    pair.as_ref().and_then(|p| p.opis.clone())
}

fn kod(pair: &Option<KodOpis>) -> Option<String> {
    pair.as_ref().and_then(|p| p.kod.clone())
}

/// Description when present, code otherwise. Dictionary entries are not
/// guaranteed to carry both.
fn opis_or_kod(pair: &KodOpis) -> Option<String> {
    pair.opis.clone().or_else(|| pair.kod.clone())
}

fn species_from(pair: &Option<KodOpis>) -> Option<Species> {
    let pair = pair.as_ref()?;
    if let Some(name) = pair.opis.as_deref() {
        return Some(Species::from_registry_name(name));
    }
    pair.kod.as_deref().map(Species::from_registry_code)
}

fn gender_from(pair: &Option<KodOpis>) -> Option<Gender> {
    let pair = pair.as_ref()?;
    if let Some(label) = pair.opis.as_deref() {
        return Some(Gender::from_registry_label(label));
    }
    pair.kod.as_deref().map(Gender::from_registry_code)
}

pub fn normalize_animal(rec: &AnimalRecord) -> NormalizedAnimal {
    let ear_tag = rec
        .numer_kolczyka
        .clone()
        .or_else(|| rec.numer_identyfikacyjny.clone())
        .unwrap_or_default();
    NormalizedAnimal {
        irz_id: ear_tag.clone(),
        ear_tag_number: ear_tag,
        species: rec
            .gatunek
            .as_deref()
            .map(Species::from_registry_name)
            .unwrap_or(Species::Cattle),
        breed: rec.rasa.clone(),
        gender: rec
            .plec
            .as_deref()
            .map(Gender::from_registry_label)
            .unwrap_or(Gender::Female),
        birth_date: rec.data_urodzenia.clone(),
        mother_ear_tag: rec.numer_matki_kolczyk.clone(),
        herd_number: None,
        group_count: None,
    }
}

pub fn normalize_individual_details(rec: &IndividualDetailsRecord) -> IndividualDetails {
    let id = rec
        .numer_identyfikacyjny_zwierzecia
        .clone()
        .unwrap_or_default();
    let breed = opis(&rec.kod_rasy);
    let animal = NormalizedAnimal {
        irz_id: id.clone(),
        ear_tag_number: id,
        species: species_from(&rec.gatunek).unwrap_or(Species::Cattle),
        breed: breed.clone(),
        gender: gender_from(&rec.plec).unwrap_or(Gender::Female),
        birth_date: rec.data_urodzenia.clone(),
        mother_ear_tag: None,
        herd_number: rec.numer_dzialalnosci.clone(),
        group_count: None,
    };
    IndividualDetails {
        animal,
        species_code: kod(&rec.gatunek),
        species_name: opis(&rec.gatunek),
        breed_code: kod(&rec.kod_rasy),
        gender_code: kod(&rec.plec),
        gender_name: opis(&rec.plec),
        was_mother: rec.czy_matka.unwrap_or(false),
        deregistration_date: rec.data_wyrejestrowania.clone(),
        body_weight: rec.masa_ciala_zwierzecia,
        carcass_weight: rec.masa_tuszy,
        activity_number: rec.numer_dzialalnosci.clone(),
        marking_method: rec.sposob_oznakowania.clone(),
        dds_statement: rec.informacja_o_oswiadczeniu_dds.clone(),
    }
}

pub fn normalize_horse(rec: &HorseRecord) -> Horse {
    let ueln = rec.niepowtarzalny_dozywotni_numer.clone().unwrap_or_default();
    let details = rec.szczegoly_zwierze_koniowate.as_ref();
    // The transponder currently worn is the history entry without an end date.
    let current_transponder = rec
        .historia_kodow_transpondera
        .iter()
        .flatten()
        .find(|t| t.data_obowiazywania_do.is_none())
        .and_then(|t| t.numer_kod_transpondera.clone());
    let animal = NormalizedAnimal {
        irz_id: rec
            .id_koniowatego
            .map(|id| id.to_string())
            .unwrap_or_else(|| ueln.clone()),
        ear_tag_number: ueln.clone(),
        species: Species::Horse,
        breed: details.and_then(|d| opis(&d.rasa)),
        gender: gender_from(&rec.plec).unwrap_or(Gender::Female),
        birth_date: rec.data_urodzenia.clone(),
        mother_ear_tag: details
            .and_then(|d| d.niepowtarzalny_dozywotni_numer_ueln_matki.clone()),
        herd_number: rec.numer_dzialalnosci.clone(),
        group_count: None,
    };
    Horse {
        animal,
        ueln,
        name: rec.imie_nazwa_koniowatego.clone(),
        coat: opis(&rec.masc),
        breed_type: details.and_then(|d| opis(&d.typ_rasowy)),
        transponder_code: current_transponder
            .or_else(|| details.and_then(|d| d.numer_kod_transpondera.clone())),
        father_ueln: details
            .and_then(|d| d.niepowtarzalny_dozywotni_numer_ueln_ojca_dawcy_nasienia.clone()),
        father_name: details.and_then(|d| d.nazwa_ojca_lub_dawcy_nasienia.clone()),
        is_castrated: details.and_then(|d| d.kastracja).unwrap_or(false),
        castration_date: details.and_then(|d| d.data_kastracji.clone()),
        country_of_origin: opis(&rec.kraj_pochodzenia)
            .or_else(|| details.and_then(|d| opis(&d.kod_kraju_urodzenia))),
    }
}

pub fn normalize_poultry_batch(rec: &PoultryBatchRecord) -> PoultryBatch {
    PoultryBatch {
        batch_number: rec.numer_partii_drobiu.clone().unwrap_or_default(),
        species_code: kod(&rec.gatunek),
        species_name: opis(&rec.gatunek),
        poultry_count: rec.liczba_sztuk_drobiu.unwrap_or(0),
        hatching_eggs_count: rec.liczba_sztuk_jaj_wylegowych.unwrap_or(0),
        activity_number: rec.numer_dzialalnosci.clone(),
    }
}

impl PoultryBatch {
    /// The unified view of a batch: the batch number stands in for the ear
    /// tag and `group_count` carries the head count.
    pub fn to_animal(&self) -> NormalizedAnimal {
        NormalizedAnimal {
            irz_id: self.batch_number.clone(),
            ear_tag_number: self.batch_number.clone(),
            species: Species::Poultry,
            breed: self.species_name.clone(),
            gender: Gender::Female,
            birth_date: None,
            mother_ear_tag: None,
            herd_number: self.activity_number.clone(),
            group_count: Some(self.poultry_count),
        }
    }
}

pub fn normalize_poultry_event(rec: &PoultryEventRecord) -> PoultryEvent {
    let id = rec
        .uuid
        .clone()
        .or_else(|| rec.lp.map(|n| n.to_string()))
        .unwrap_or_default();
    PoultryEvent {
        id,
        batch_number: rec.numer_partii_drobiu.clone().unwrap_or_default(),
        species_code: kod(&rec.gatunek),
        species_name: opis(&rec.gatunek),
        poultry_count: rec.liczba_sztuk_drobiu.unwrap_or(0),
        hatching_eggs_count: rec.liczba_sztuk_jaj_wylegowych.unwrap_or(0),
        event_type: kod(&rec.typ_zdarzenia),
        event_type_name: opis(&rec.typ_zdarzenia),
        event_status: kod(&rec.stan_zdarzenia),
        event_status_name: opis(&rec.stan_zdarzenia),
        event_date: rec.data_zdarzenia.clone(),
        reporting_activity_number: rec.numer_dzialalnosci_zglaszajacej.clone(),
        complementary_activity_number: rec.numer_dzialalnosci_komplementarnej.clone(),
        errors: rec
            .blad
            .iter()
            .flatten()
            .map(|e| PoultryEventError {
                code: e.kod_bledu.clone(),
                message: e.komunikat.clone(),
            })
            .collect(),
    }
}

pub fn normalize_pig_herd(rec: &PigHerdRecord) -> PigHerd {
    PigHerd {
        activity_number: rec.numer_dzialalnosci.clone(),
        total_pigs: rec.liczba_swin.unwrap_or(0),
        tagged_pigs: rec.liczba_swin_oznakowanych.unwrap_or(0),
        untagged_pigs: rec.liczba_swin_nieoznakowanych.unwrap_or(0),
        production_technologies: rec
            .technologia_produkcji
            .iter()
            .flatten()
            .filter_map(opis_or_kod)
            .collect(),
        keeping_systems: rec
            .system_utrzymania_swin
            .iter()
            .flatten()
            .filter_map(opis_or_kod)
            .collect(),
        sow_numbers: rec
            .numery_lochy
            .iter()
            .flatten()
            .filter_map(|s| s.indywidualny_numer_identyfikacyjny_lochy.clone())
            .collect(),
    }
}

impl PigHerd {
    /// Sows are the individually identified members of a herd; each number
    /// becomes one unified pig record under the herd's activity number.
    pub fn sow_animals(&self) -> Vec<NormalizedAnimal> {
        self.sow_numbers
            .iter()
            .map(|tag| NormalizedAnimal {
                irz_id: tag.clone(),
                ear_tag_number: tag.clone(),
                species: Species::Pig,
                breed: None,
                gender: Gender::Female,
                birth_date: None,
                mother_ear_tag: None,
                herd_number: self.activity_number.clone(),
                group_count: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn animal_prefers_ear_tag_over_registry_id() {
        let rec: AnimalRecord = serde_json::from_str(
            r#"{
                "numerIdentyfikacyjny": "ID-1",
                "numerKolczyka": "PL005123456789",
                "gatunek": "Bydło",
                "rasa": "HO",
                "plec": "samiec",
                "dataUrodzenia": "2023-04-01",
                "numerMatkiKolczyk": "PL005123456000"
            }"#,
        )
        .unwrap();
        let a = normalize_animal(&rec);
        assert_eq!(a.ear_tag_number, "PL005123456789");
        assert_eq!(a.irz_id, "PL005123456789");
        assert_eq!(a.species, Species::Cattle);
        assert_eq!(a.gender, Gender::Male);
        assert_eq!(a.mother_ear_tag.as_deref(), Some("PL005123456000"));
    }

    #[test]
    fn animal_falls_back_to_registry_id_then_empty() {
        let rec: AnimalRecord =
            serde_json::from_str(r#"{"numerIdentyfikacyjny":"PL9","gatunek":"owce"}"#).unwrap();
        let a = normalize_animal(&rec);
        assert_eq!(a.ear_tag_number, "PL9");
        assert_eq!(a.species, Species::Sheep);
        assert_eq!(a.gender, Gender::Female);

        let empty = normalize_animal(&AnimalRecord::default());
        assert_eq!(empty.ear_tag_number, "");
        assert_eq!(empty.species, Species::Cattle);
    }

    #[test]
    fn individual_details_carry_code_name_pairs() {
        let rec: IndividualDetailsRecord = serde_json::from_str(
            r#"{
                "numerIdentyfikacyjnyZwierzecia": "PL005123456789",
                "gatunek": {"kod": "B", "opis": "Bydło"},
                "plec": {"kod": "o", "opis": "samiec"},
                "kodRasy": {"kod": "HO", "opis": "holsztyńsko-fryzyjska"},
                "czyMatka": false,
                "masaCialaZwierzecia": 540.5,
                "numerDzialalnosci": "071588967-001",
                "sposobOznakowania": "kolczyk"
            }"#,
        )
        .unwrap();
        let d = normalize_individual_details(&rec);
        assert_eq!(d.animal.ear_tag_number, "PL005123456789");
        assert_eq!(d.animal.species, Species::Cattle);
        assert_eq!(d.animal.gender, Gender::Male);
        assert_eq!(d.animal.breed.as_deref(), Some("holsztyńsko-fryzyjska"));
        assert_eq!(d.breed_code.as_deref(), Some("HO"));
        assert_eq!(d.body_weight, Some(540.5));
        assert!(!d.was_mother);
        assert_eq!(d.activity_number.as_deref(), Some("071588967-001"));
    }

    #[test]
    fn horse_uses_ueln_and_current_transponder() {
        let rec: HorseRecord = serde_json::from_str(
            r#"{
                "idKoniowatego": 4421,
                "niepowtarzalnyDozywotniNumer": "616009600123456",
                "imieNazwaKoniowatego": "Kasztanka",
                "plec": {"opis": "klacz"},
                "masc": {"opis": "kasztanowata"},
                "numerDzialalnosci": "071588967-001",
                "krajPochodzenia": {"kod": "PL", "opis": "Polska"},
                "szczegolyZwierzeKoniowate": {
                    "rasa": {"kod": "m", "opis": "małopolska"},
                    "typRasowy": {"opis": "szlachetna półkrew"},
                    "niepowtarzalnyDozywotniNumerUelnMatki": "616009600100000",
                    "kastracja": false,
                    "numerKodTranspondera": "98500012345"
                },
                "historiaKodowTranspondera": [
                    {"numerKodTranspondera": "98500099999", "dataObowiazywaniaOd": "2019-01-01", "dataObowiazywaniaDo": "2021-06-01"},
                    {"numerKodTranspondera": "98500011111", "dataObowiazywaniaOd": "2021-06-01"}
                ]
            }"#,
        )
        .unwrap();
        let h = normalize_horse(&rec);
        assert_eq!(h.animal.irz_id, "4421");
        assert_eq!(h.animal.ear_tag_number, "616009600123456");
        assert_eq!(h.animal.species, Species::Horse);
        assert_eq!(h.animal.gender, Gender::Female);
        assert_eq!(h.animal.mother_ear_tag.as_deref(), Some("616009600100000"));
        assert_eq!(h.transponder_code.as_deref(), Some("98500011111"));
        assert_eq!(h.coat.as_deref(), Some("kasztanowata"));
        assert_eq!(h.country_of_origin.as_deref(), Some("Polska"));
        assert!(!h.is_castrated);
    }

    #[test]
    fn horse_without_registry_id_keys_on_ueln() {
        let rec: HorseRecord =
            serde_json::from_str(r#"{"niepowtarzalnyDozywotniNumer":"616009600123456"}"#).unwrap();
        let h = normalize_horse(&rec);
        assert_eq!(h.animal.irz_id, "616009600123456");
        assert!(h.transponder_code.is_none());
    }

    #[test]
    fn poultry_batch_to_unified_record() {
        let rec: PoultryBatchRecord = serde_json::from_str(
            r#"{
                "numerPartiiDrobiu": "PL-DR-0042",
                "gatunek": {"kod": "KU", "opis": "kura"},
                "liczbaSztukDrobiu": 1500,
                "numerDzialalnosci": "071588967-002"
            }"#,
        )
        .unwrap();
        let batch = normalize_poultry_batch(&rec);
        assert_eq!(batch.poultry_count, 1500);
        assert_eq!(batch.hatching_eggs_count, 0);

        let a = batch.to_animal();
        assert_eq!(a.ear_tag_number, "PL-DR-0042");
        assert_eq!(a.species, Species::Poultry);
        assert_eq!(a.group_count, Some(1500));
        assert_eq!(a.herd_number.as_deref(), Some("071588967-002"));
    }

    #[test]
    fn poultry_event_id_falls_back_to_ordinal() {
        let rec: PoultryEventRecord = serde_json::from_str(
            r#"{
                "lp": 7,
                "numerPartiiDrobiu": "PL-DR-0042",
                "typZdarzenia": {"kod": "ZW", "opis": "wstawienie"},
                "stanZdarzenia": {"kod": "Z"},
                "blad": [{"kodBledu": "W01", "komunikat": "ostrzeżenie"}]
            }"#,
        )
        .unwrap();
        let e = normalize_poultry_event(&rec);
        assert_eq!(e.id, "7");
        assert_eq!(e.event_type.as_deref(), Some("ZW"));
        assert_eq!(e.event_type_name.as_deref(), Some("wstawienie"));
        assert!(e.event_status_name.is_none());
        assert_eq!(e.errors.len(), 1);
        assert_eq!(e.errors[0].code.as_deref(), Some("W01"));
    }

    #[test]
    fn pig_herd_sows_become_pig_records() {
        let rec: PigHerdRecord = serde_json::from_str(
            r#"{
                "numerDzialalnosci": "071588967-001",
                "liczbaSwin": 240,
                "liczbaSwinOznakowanych": 2,
                "liczbaSwinNieoznakowanych": 238,
                "technologiaProdukcji": [{"kod": "O", "opis": "otwarty"}],
                "systemUtrzymaniaSwin": [{"kod": "S"}],
                "numeryLochy": [
                    {"indywidualnyNumerIdentyfikacyjnyLochy": "PL071588967001"},
                    {"indywidualnyNumerIdentyfikacyjnyLochy": "PL071588967002"}
                ]
            }"#,
        )
        .unwrap();
        let herd = normalize_pig_herd(&rec);
        assert_eq!(herd.total_pigs, 240);
        assert_eq!(herd.production_technologies, vec!["otwarty"]);
        assert_eq!(herd.keeping_systems, vec!["S"]);

        let sows = herd.sow_animals();
        assert_eq!(sows.len(), 2);
        assert_eq!(sows[0].ear_tag_number, "PL071588967001");
        assert_eq!(sows[0].species, Species::Pig);
        assert_eq!(sows[0].gender, Gender::Female);
        assert_eq!(sows[0].herd_number.as_deref(), Some("071588967-001"));
    }
}
