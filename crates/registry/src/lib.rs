//! Client for IRZ+ (Identyfikacja i Rejestracja Zwierząt), the Polish
//! national livestock registry run by ARiMR.
//!
//! The registry splits its data API by animal category, each with its own
//! payload shape and Polish field names; [`normalize`] folds them into one
//! unified record set. Authentication goes through the ARiMR SSO
//! (Keycloak password grant) with per-user token caching.

pub mod auth;
pub mod client;
pub mod error;
pub mod normalize;
pub mod types;

pub use auth::{Credentials, TokenService};
pub use client::{
    DeathReport, IrzClient, IrzConfig, IrzMode, PoultryEventFilter, SubmitOutcome,
};
pub use error::IrzError;
pub use normalize::{
    Horse, IndividualDetails, NormalizedAnimal, PigHerd, PoultryBatch, PoultryEvent,
};
