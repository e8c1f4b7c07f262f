//! Typed client for the IRZ+ data API.
//!
//! IRZ+ splits its surface by animal category, each under its own service
//! prefix with the environment segment baked into the path. Paths here are
//! written in their production form and [`IrzClient::endpoint`] substitutes
//! the configured mode, so the same client runs against the test or the
//! production gateway.

use std::convert::Infallible;
use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use herdbook_core::{DeathCause, DisposalMethod};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{Credentials, TokenService};
use crate::error::IrzError;
use crate::normalize::{
    self, Horse, IndividualDetails, NormalizedAnimal, PigHerd, PoultryBatch, PoultryEvent,
};
use crate::types::{
    AnimalsEnvelope, DeathReportPayload, HorsesEnvelope, IndividualDetailsRecord, PigHerdEnvelope,
    PoultryEnvelope, PoultryEventsEnvelope, SubmissionResponse,
};

const INDIVIDUAL_ANIMALS: &str = "/indywidualne/zwierze/api/prod/zwierzetaIndywidualne";
const INDIVIDUAL_DETAILS: &str = "/indywidualne/zwierze/api/prod/zwierzeIndywidualne";
const PIG_DATA: &str = "/grupowe/swinie/api/prod/dane";
const POULTRY_ANIMALS: &str = "/drob/zwierze/api/prod/drob";
const POULTRY_EVENTS: &str = "/drob/zdarzenia/api/prod/zdarzeniadrob";
const HORSES: &str = "/koniowate/zwierze/api/prod/koniowate";
const DEATH_REPORT: &str = "/indywidualne/dokument/api/prod/zpzu";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const SUBMIT_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_ATTEMPTS: u32 = 3;

/// Which IRZ+ environment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrzMode {
    Test,
    Prod,
}

impl IrzMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IrzMode::Test => "test",
            IrzMode::Prod => "prod",
        }
    }
}

impl FromStr for IrzMode {
    type Err = Infallible;

    /// Anything that is not explicitly production means test, so a typo in
    /// the environment never points the client at the live registry.
    fn from_str(s: &str) -> Result<Self, Infallible> {
        if s.eq_ignore_ascii_case("prod") || s.eq_ignore_ascii_case("production") {
            Ok(IrzMode::Prod)
        } else {
            Ok(IrzMode::Test)
        }
    }
}

#[derive(Debug, Clone)]
pub struct IrzConfig {
    pub base_url: String,
    pub sso_url: String,
    pub client_id: String,
    pub mode: IrzMode,
}

impl Default for IrzConfig {
    fn default() -> Self {
        Self {
            base_url: "https://irz.arimr.gov.pl/api".to_string(),
            sso_url:
                "https://sso.arimr.gov.pl/auth/realms/ewniosekplus/protocol/openid-connect/token"
                    .to_string(),
            client_id: "aplikacja-irzplus".to_string(),
            mode: IrzMode::Test,
        }
    }
}

/// Optional filters for the poultry event listing, passed through as the
/// upstream query parameters.
#[derive(Debug, Clone, Default)]
pub struct PoultryEventFilter {
    pub producer_number: Option<String>,
    pub activity_number: Option<String>,
    pub batch_number: Option<String>,
    pub species_code: Option<String>,
    pub event_type: Option<String>,
    pub event_state: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl PoultryEventFilter {
    fn query(&self) -> Vec<(&'static str, String)> {
        let mut q = Vec::new();
        let mut push = |key, value: &Option<String>| {
            if let Some(v) = value {
                q.push((key, v.clone()));
            }
        };
        push("numerProducenta", &self.producer_number);
        push("numerDzialalnosci", &self.activity_number);
        push("numerPartiiDrobiu", &self.batch_number);
        push("gatunek", &self.species_code);
        push("typZdarzenia", &self.event_type);
        push("stanZdarzenia", &self.event_state);
        push("dataZdarzeniaOd", &self.date_from);
        push("dataZdarzeniaDo", &self.date_to);
        q
    }
}

/// A death/disposal report (ZPZU) ready for submission.
#[derive(Debug, Clone)]
pub struct DeathReport {
    pub ear_tag_number: String,
    pub death_date: String,
    pub death_cause: DeathCause,
    pub disposal_method: DisposalMethod,
    pub producer_number: String,
}

impl DeathReport {
    fn payload(&self) -> DeathReportPayload {
        DeathReportPayload {
            numer_kolczyka: self.ear_tag_number.clone(),
            data_padniecia: self.death_date.clone(),
            przyczyna_padniecia: death_cause_code(self.death_cause).to_string(),
            sposob_utylizacji: disposal_method_code(self.disposal_method).to_string(),
            numer_producenta: self.producer_number.clone(),
        }
    }
}

/// Registry dictionary value for a death cause.
fn death_cause_code(cause: DeathCause) -> &'static str {
    match cause {
        DeathCause::Natural => "NATURALNA",
        DeathCause::Disease => "CHOROBA",
        DeathCause::Accident => "WYPADEK",
        DeathCause::Euthanasia => "EUTANAZJA",
        DeathCause::Unknown => "NIEZNANA",
    }
}

/// Registry dictionary value for a carcass disposal method.
fn disposal_method_code(method: DisposalMethod) -> &'static str {
    match method {
        DisposalMethod::RenderingPlant => "ZAKLAD_UTYLIZACYJNY",
        DisposalMethod::Burial => "POCHOWEK",
        DisposalMethod::Veterinary => "BADANIA_WETERYNARYJNE",
    }
}

/// Outcome of a document submission. Upstream rejection is reported here,
/// not as an `Err`; only transport-level failures error out.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct IrzClient {
    http: reqwest::Client,
    config: IrzConfig,
    auth: TokenService,
}

impl IrzClient {
    pub fn new(config: IrzConfig) -> Result<Self, IrzError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .default_headers(headers)
            .build()?;
        let auth = TokenService::new(&config.sso_url, &config.client_id)?;
        Ok(Self { http, config, auth })
    }

    pub fn mode(&self) -> IrzMode {
        self.config.mode
    }

    /// Acquires (or reuses) an SSO token for the credentials without
    /// touching any data endpoint. A sync run calls this up front so bad
    /// credentials fail before the category fetches start.
    pub async fn authenticate(&self, creds: &Credentials) -> Result<(), IrzError> {
        self.auth.token(creds).await.map(|_| ())
    }

    /// Full URL for a templated path, with the environment segment replaced
    /// by the configured mode.
    fn endpoint(&self, path: &str) -> String {
        let segment = format!("/{}/", self.config.mode.as_str());
        let path = path.replace("/prod/", &segment).replace("/test/", &segment);
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET with the category-list retry policy: 401 means the token is gone
    /// and is not retried, server errors back off at 2^attempt seconds, and
    /// anything else fails on the spot.
    async fn get_with_retry<T: DeserializeOwned>(
        &self,
        creds: &Credentials,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, IrzError> {
        let token = self.auth.token(creds).await?;
        let url = self.endpoint(path);

        for attempt in 1..=MAX_ATTEMPTS {
            let resp = self
                .http
                .get(&url)
                .bearer_auth(&token)
                .query(query)
                .send()
                .await?;
            let status = resp.status();

            if status.is_success() {
                return Ok(resp.json().await?);
            }
            if status == StatusCode::UNAUTHORIZED {
                self.auth.clear(&creds.username).await;
                return Err(IrzError::TokenExpired);
            }
            if status.is_server_error() && attempt < MAX_ATTEMPTS {
                let delay = 2u64.pow(attempt);
                warn!(
                    "IRZ+ returned HTTP {}, attempt {}/{}, retrying in {}s",
                    status.as_u16(),
                    attempt,
                    MAX_ATTEMPTS,
                    delay,
                );
                tokio::time::sleep(Duration::from_secs(delay)).await;
                continue;
            }
            if status.is_server_error() {
                break;
            }
            let body = resp.text().await.unwrap_or_default();
            return Err(IrzError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        Err(IrzError::RetriesExhausted)
    }

    /// Individual animals (cattle, sheep, goats, deer, camels) registered
    /// under a producer number, as unified records.
    pub async fn fetch_individual(
        &self,
        creds: &Credentials,
        producer_number: &str,
    ) -> Result<Vec<NormalizedAnimal>, IrzError> {
        let envelope: AnimalsEnvelope = self
            .get_with_retry(
                creds,
                INDIVIDUAL_ANIMALS,
                &[("numerProducenta", producer_number.to_string())],
            )
            .await?;
        Ok(envelope
            .into_records()
            .iter()
            .map(normalize::normalize_animal)
            .collect())
    }

    /// Detail lookup for one individual animal. Returns `None` when the
    /// registry has no record under that number; no retry loop.
    pub async fn fetch_individual_details(
        &self,
        creds: &Credentials,
        animal_number: &str,
    ) -> Result<Option<IndividualDetails>, IrzError> {
        let token = self.auth.token(creds).await?;
        let url = self.endpoint(INDIVIDUAL_DETAILS);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&token)
            .query(&[("numerIdentyfikacyjnyZwierzecia", animal_number)])
            .send()
            .await?;
        let status = resp.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if status == StatusCode::UNAUTHORIZED {
            self.auth.clear(&creds.username).await;
            return Err(IrzError::TokenExpired);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(IrzError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let record: IndividualDetailsRecord = resp.json().await?;
        if record
            .numer_identyfikacyjny_zwierzecia
            .as_deref()
            .unwrap_or_default()
            .is_empty()
        {
            return Ok(None);
        }
        Ok(Some(normalize::normalize_individual_details(&record)))
    }

    /// Pig records for a producer. Pigs are registered per herd; rows that
    /// carry an individual number (sows) come through with ear tags, the
    /// rest surface only in the herd view.
    pub async fn fetch_pigs(
        &self,
        creds: &Credentials,
        producer_number: &str,
    ) -> Result<Vec<NormalizedAnimal>, IrzError> {
        let envelope: AnimalsEnvelope = self
            .get_with_retry(
                creds,
                PIG_DATA,
                &[("numerProducenta", producer_number.to_string())],
            )
            .await?;
        Ok(envelope
            .into_records()
            .iter()
            .map(normalize::normalize_animal)
            .collect())
    }

    /// Herd-level decode of the same pig data: stock totals, production
    /// technologies, keeping systems, and the sow register.
    pub async fn fetch_pig_herds(
        &self,
        creds: &Credentials,
        producer_number: &str,
    ) -> Result<Vec<PigHerd>, IrzError> {
        let envelope: PigHerdEnvelope = self
            .get_with_retry(
                creds,
                PIG_DATA,
                &[("numerProducenta", producer_number.to_string())],
            )
            .await?;
        Ok(envelope
            .dane
            .unwrap_or_default()
            .iter()
            .map(normalize::normalize_pig_herd)
            .collect())
    }

    /// Poultry batches registered under a producer number.
    pub async fn fetch_poultry(
        &self,
        creds: &Credentials,
        producer_number: &str,
    ) -> Result<Vec<PoultryBatch>, IrzError> {
        let envelope: PoultryEnvelope = self
            .get_with_retry(
                creds,
                POULTRY_ANIMALS,
                &[("numerProducenta", producer_number.to_string())],
            )
            .await?;
        Ok(envelope
            .dane
            .unwrap_or_default()
            .iter()
            .map(normalize::normalize_poultry_batch)
            .collect())
    }

    /// Poultry events (placements, sales, dispatches) matching the filter.
    pub async fn fetch_poultry_events(
        &self,
        creds: &Credentials,
        filter: &PoultryEventFilter,
    ) -> Result<Vec<PoultryEvent>, IrzError> {
        let envelope: PoultryEventsEnvelope = self
            .get_with_retry(creds, POULTRY_EVENTS, &filter.query())
            .await?;
        Ok(envelope
            .lista_zdarzenie
            .unwrap_or_default()
            .iter()
            .map(normalize::normalize_poultry_event)
            .collect())
    }

    /// Equines registered under a producer number.
    pub async fn fetch_horses(
        &self,
        creds: &Credentials,
        producer_number: &str,
    ) -> Result<Vec<Horse>, IrzError> {
        let envelope: HorsesEnvelope = self
            .get_with_retry(
                creds,
                HORSES,
                &[("numerProducenta", producer_number.to_string())],
            )
            .await?;
        Ok(envelope
            .lista_zwierzeta
            .unwrap_or_default()
            .iter()
            .map(normalize::normalize_horse)
            .collect())
    }

    /// Files a ZPZU death/disposal report. Any 2xx counts as accepted; a
    /// rejection comes back as an unsuccessful outcome with the upstream
    /// message, and the document number falls back to a generated one when
    /// the response omits it.
    pub async fn submit_death_report(
        &self,
        creds: &Credentials,
        report: &DeathReport,
    ) -> Result<SubmitOutcome, IrzError> {
        let token = self.auth.token(creds).await?;
        let url = self.endpoint(DEATH_REPORT);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&token)
            .timeout(SUBMIT_TIMEOUT)
            .json(&report.payload())
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let parsed: SubmissionResponse = serde_json::from_str(&body).unwrap_or_default();
            let error = parsed
                .error_summary()
                .unwrap_or_else(|| format!("IRZ+ rejected the report (HTTP {})", status.as_u16()));
            warn!("death report rejected with HTTP {}", status.as_u16());
            return Ok(SubmitOutcome {
                success: false,
                document_number: None,
                error: Some(error),
            });
        }

        let parsed: SubmissionResponse = resp.json().await.unwrap_or_default();
        let document_number = parsed
            .numer_dokumentu
            .filter(|n| !n.is_empty())
            .unwrap_or_else(fallback_document_number);
        info!(%document_number, "death report submitted");
        Ok(SubmitOutcome {
            success: true,
            document_number: Some(document_number),
            error: None,
        })
    }
}

fn fallback_document_number() -> String {
    format!("ZPZU-{}", Utc::now().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(mode: IrzMode) -> IrzClient {
        IrzClient::new(IrzConfig {
            base_url: "https://irz.example/api".to_string(),
            sso_url: "https://sso.example/token".to_string(),
            client_id: "aplikacja-irzplus".to_string(),
            mode,
        })
        .unwrap()
    }

    #[test]
    fn endpoint_substitutes_mode_segment() {
        let test = client(IrzMode::Test);
        assert_eq!(
            test.endpoint(INDIVIDUAL_ANIMALS),
            "https://irz.example/api/indywidualne/zwierze/api/test/zwierzetaIndywidualne"
        );
        // A path already written in test form normalizes the same way.
        assert_eq!(
            test.endpoint("/x/api/test/y"),
            "https://irz.example/api/x/api/test/y"
        );

        let prod = client(IrzMode::Prod);
        assert_eq!(
            prod.endpoint(DEATH_REPORT),
            "https://irz.example/api/indywidualne/dokument/api/prod/zpzu"
        );
        assert_eq!(
            prod.endpoint("/x/api/test/y"),
            "https://irz.example/api/x/api/prod/y"
        );
    }

    #[test]
    fn endpoint_tolerates_trailing_slash_in_base() {
        let c = IrzClient::new(IrzConfig {
            base_url: "https://irz.example/api/".to_string(),
            ..IrzConfig::default()
        })
        .unwrap();
        assert_eq!(
            c.endpoint(HORSES),
            "https://irz.example/api/koniowate/zwierze/api/test/koniowate"
        );
    }

    #[test]
    fn mode_parses_leniently_but_defaults_to_test() {
        assert_eq!("prod".parse::<IrzMode>().unwrap(), IrzMode::Prod);
        assert_eq!("PRODUCTION".parse::<IrzMode>().unwrap(), IrzMode::Prod);
        assert_eq!("test".parse::<IrzMode>().unwrap(), IrzMode::Test);
        assert_eq!("staging".parse::<IrzMode>().unwrap(), IrzMode::Test);
        assert_eq!("".parse::<IrzMode>().unwrap(), IrzMode::Test);
    }

    #[test]
    fn death_report_maps_to_registry_dictionary() {
        let report = DeathReport {
            ear_tag_number: "PL005123456789".to_string(),
            death_date: "2025-03-01".to_string(),
            death_cause: DeathCause::Disease,
            disposal_method: DisposalMethod::RenderingPlant,
            producer_number: "071588967".to_string(),
        };
        let json = serde_json::to_value(report.payload()).unwrap();
        assert_eq!(json["numerKolczyka"], "PL005123456789");
        assert_eq!(json["dataPadniecia"], "2025-03-01");
        assert_eq!(json["przyczynaPadniecia"], "CHOROBA");
        assert_eq!(json["sposobUtylizacji"], "ZAKLAD_UTYLIZACYJNY");
        assert_eq!(json["numerProducenta"], "071588967");
    }

    #[test]
    fn every_dictionary_value_is_covered() {
        let causes = [
            (DeathCause::Natural, "NATURALNA"),
            (DeathCause::Disease, "CHOROBA"),
            (DeathCause::Accident, "WYPADEK"),
            (DeathCause::Euthanasia, "EUTANAZJA"),
            (DeathCause::Unknown, "NIEZNANA"),
        ];
        for (cause, expected) in causes {
            assert_eq!(death_cause_code(cause), expected);
        }
        let methods = [
            (DisposalMethod::RenderingPlant, "ZAKLAD_UTYLIZACYJNY"),
            (DisposalMethod::Burial, "POCHOWEK"),
            (DisposalMethod::Veterinary, "BADANIA_WETERYNARYJNE"),
        ];
        for (method, expected) in methods {
            assert_eq!(disposal_method_code(method), expected);
        }
    }

    #[test]
    fn poultry_filter_emits_only_set_params() {
        let filter = PoultryEventFilter {
            producer_number: Some("071588967".to_string()),
            batch_number: Some("PL-DR-0042".to_string()),
            date_from: Some("2025-01-01".to_string()),
            ..PoultryEventFilter::default()
        };
        let q = filter.query();
        assert_eq!(
            q,
            vec![
                ("numerProducenta", "071588967".to_string()),
                ("numerPartiiDrobiu", "PL-DR-0042".to_string()),
                ("dataZdarzeniaOd", "2025-01-01".to_string()),
            ]
        );
        assert!(PoultryEventFilter::default().query().is_empty());
    }

    #[test]
    fn fallback_document_number_is_prefixed() {
        assert!(fallback_document_number().starts_with("ZPZU-"));
    }
}
