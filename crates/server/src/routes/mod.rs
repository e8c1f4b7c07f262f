pub mod animals;
pub mod auth;
pub mod dashboard;
pub mod documents;
pub mod farms;
pub mod health;
pub mod registry;
pub mod sync;

use herdbook_core::domain::Farm;
use herdbook_registry::Credentials;

use crate::error::ApiErr;
use crate::AppState;

/// Loads a farm and checks it belongs to the caller. Unknown ids are a
/// 404, someone else's farm a 403.
pub(crate) fn owned_farm(state: &AppState, farm_id: &str, user_id: &str) -> Result<Farm, ApiErr> {
    let farm = state
        .store
        .farm_by_id(farm_id)?
        .ok_or_else(|| ApiErr::not_found("farm not found"))?;
    if farm.user_id != user_id {
        return Err(ApiErr::forbidden("not your farm"));
    }
    Ok(farm)
}

/// Unseals the caller's stored IRZ+ credentials. Missing credentials are
/// a 400 so the client prompts for them instead of retrying.
pub(crate) fn irz_credentials_for(state: &AppState, user_id: &str) -> Result<Credentials, ApiErr> {
    let (login, sealed) = state
        .store
        .irz_credentials(user_id)?
        .ok_or_else(|| ApiErr::bad_request("no IRZ+ credentials linked"))?;
    let password = herdbook_api::crypto::open_sealed(&state.config.seal_key, &sealed)?;
    Ok(Credentials {
        username: login,
        password,
    })
}
