use axum::{
    extract::{FromRef, FromRequestParts, State},
    http::{request::Parts, StatusCode},
    Json,
};
use std::time::{SystemTime, UNIX_EPOCH};

use herdbook_api::crypto::{sign_token, verify_token};
use herdbook_api::{service, MeResponse, RegisterRequest, RegisterResponse};
use herdbook_core::domain::{ActivityAction, ActivityEntry, EntityType, User};

use crate::error::ApiErr;
use crate::AppState;

/// Seconds since the Unix epoch, for token signing and verification.
pub(crate) fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Auth extractor
// ---------------------------------------------------------------------------

/// Authenticated user extracted from the `Authorization: Bearer <token>` header.
pub struct AuthUser {
    pub user_id: String,
    pub email: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiErr;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);

        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiErr::unauthorized("missing or invalid Authorization header"))?;

        let user_id = verify_token(token, &state.config.token_secret, now_unix())?;
        let user = state
            .store
            .user_by_id(&user_id)?
            .ok_or_else(|| ApiErr::unauthorized("unknown user"))?;

        Ok(AuthUser {
            user_id: user.id,
            email: user.email,
        })
    }
}

// ---------------------------------------------------------------------------
// Register
// ---------------------------------------------------------------------------

/// POST /api/auth/register — provision a user and mint their bearer token.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiErr> {
    let email = service::validate_email(&req.email)?;
    let display_name = match req.display_name.as_deref() {
        Some(name) => Some(service::validate_display_name(name)?),
        None => None,
    };

    let user = User::new(email, display_name);
    state
        .store
        .insert_user(&user)
        .map_err(|e| match e {
            herdbook_store::StoreError::Duplicate => {
                ApiErr::conflict("email already registered")
            }
            other => ApiErr::from(other),
        })?;

    let token = sign_token(
        &user.id,
        &state.config.token_secret,
        now_unix(),
        state.config.token_ttl_secs,
    );

    state.store.record_activity(&ActivityEntry::new(
        user.id.clone(),
        ActivityAction::Register,
        Some(EntityType::User),
        Some(user.id.clone()),
        None,
    ));

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            email: user.email,
            token,
        }),
    ))
}

// ---------------------------------------------------------------------------
// Me
// ---------------------------------------------------------------------------

/// GET /api/auth/me — the caller's profile.
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<MeResponse>, ApiErr> {
    let record = state
        .store
        .user_by_id(&user.user_id)?
        .ok_or_else(|| ApiErr::unauthorized("unknown user"))?;

    let has_irz_credentials = record.has_irz_credentials();
    Ok(Json(MeResponse {
        user_id: record.id,
        email: record.email,
        display_name: record.display_name,
        has_irz_credentials,
    }))
}
