//! Validation for the identifiers IRZ+ deals in: ear tags, UELNs,
//! producer numbers, and herd numbers.

use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

static EAR_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{2}\d{8,12}$").unwrap());

static UELN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{3}\d{3}[A-Z0-9]{9}$").unwrap());

static PRODUCER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{9}$").unwrap());

static HERD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{9}-\d{3}$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentifierError {
    #[error("invalid ear tag number: {value}")]
    EarTag { value: String },
    #[error("invalid UELN: {value}")]
    Ueln { value: String },
    #[error("invalid producer number: {value} (expected 9 digits)")]
    ProducerNumber { value: String },
    #[error("invalid herd number: {value} (expected producer number + 3-digit suffix)")]
    HerdNumber { value: String },
}

/// Uppercases and trims an ear tag the way it is stored.
pub fn canonical_ear_tag(raw: &str) -> String {
    raw.trim().to_uppercase()
}

/// Ear tags are an ISO country prefix plus 8 to 12 digits. Polish cattle
/// tags are `PL` + 12, but imported animals keep their origin prefix and
/// some species use shorter national ranges.
pub fn validate_ear_tag(raw: &str) -> Result<(), IdentifierError> {
    let tag = canonical_ear_tag(raw);
    if EAR_TAG_RE.is_match(&tag) {
        Ok(())
    } else {
        Err(IdentifierError::EarTag { value: tag })
    }
}

/// UELN: 3-digit country code, 3-digit database code, 9-character
/// national identifier.
pub fn validate_ueln(raw: &str) -> Result<(), IdentifierError> {
    let ueln = raw.trim().to_uppercase();
    if UELN_RE.is_match(&ueln) {
        Ok(())
    } else {
        Err(IdentifierError::Ueln { value: ueln })
    }
}

pub fn validate_producer_number(raw: &str) -> Result<(), IdentifierError> {
    let n = raw.trim();
    if PRODUCER_RE.is_match(n) {
        Ok(())
    } else {
        Err(IdentifierError::ProducerNumber { value: n.to_string() })
    }
}

pub fn validate_herd_number(raw: &str) -> Result<(), IdentifierError> {
    let n = raw.trim();
    if HERD_RE.is_match(n) {
        Ok(())
    } else {
        Err(IdentifierError::HerdNumber { value: n.to_string() })
    }
}

/// Checks that a herd number belongs to a producer number.
pub fn herd_matches_producer(herd_number: &str, producer_number: &str) -> bool {
    herd_number
        .split_once('-')
        .is_some_and(|(prefix, _)| prefix == producer_number)
}
