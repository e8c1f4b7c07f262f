//! SSO token acquisition against the ARiMR Keycloak realm.
//!
//! IRZ+ hands out short-lived bearer tokens via the password grant. Tokens
//! are cached per username and refreshed once they get within a minute of
//! expiry, so a sync run touching several endpoints signs in once.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::error::IrzError;
use crate::types::{SsoErrorBody, TokenResponse};

/// A cached token is refreshed once it has less than this left to live.
const FRESHNESS_MARGIN: Duration = Duration::from_secs(60);

const SSO_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

/// Per-username token cache over the SSO password grant.
pub struct TokenService {
    http: reqwest::Client,
    sso_url: String,
    client_id: String,
    // Held across the refresh request so concurrent callers with the same
    // username do not race a second grant.
    cache: Mutex<HashMap<String, CachedToken>>,
}

impl TokenService {
    pub fn new(sso_url: &str, client_id: &str) -> Result<Self, IrzError> {
        let http = reqwest::Client::builder().timeout(SSO_TIMEOUT).build()?;
        Ok(Self {
            http,
            sso_url: sso_url.to_string(),
            client_id: client_id.to_string(),
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Returns a bearer token for `creds`, from cache when still fresh.
    pub async fn token(&self, creds: &Credentials) -> Result<String, IrzError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.get(&creds.username) {
            if cached.expires_at > Instant::now() + FRESHNESS_MARGIN {
                return Ok(cached.access_token.clone());
            }
        }

        debug!("requesting fresh IRZ+ token");
        let resp = self
            .http
            .post(&self.sso_url)
            .form(&[
                ("username", creds.username.as_str()),
                ("password", creds.password.as_str()),
                ("client_id", self.client_id.as_str()),
                ("grant_type", "password"),
            ])
            .send()
            .await?;

        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            let parsed: SsoErrorBody = serde_json::from_str(&body).unwrap_or_default();
            let message = parsed
                .error_description
                .or(parsed.error)
                .unwrap_or(body);
            return Err(IrzError::Auth(message));
        }

        let token: TokenResponse = resp.json().await?;
        let access_token = token.access_token.clone();
        cache.insert(
            creds.username.clone(),
            CachedToken {
                access_token: token.access_token,
                expires_at: Instant::now() + Duration::from_secs(token.expires_in),
            },
        );
        Ok(access_token)
    }

    /// Drops the cached token for `username`, forcing a new grant next time.
    pub async fn clear(&self, username: &str) {
        self.cache.lock().await.remove(username);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("http://127.0.0.1:1/token", "aplikacja-irzplus").unwrap()
    }

    #[tokio::test]
    async fn cached_token_is_reused_within_margin() {
        let svc = service();
        svc.cache.lock().await.insert(
            "user".into(),
            CachedToken {
                access_token: "tok-1".into(),
                expires_at: Instant::now() + Duration::from_secs(300),
            },
        );
        let creds = Credentials {
            username: "user".into(),
            password: "pw".into(),
        };
        assert_eq!(svc.token(&creds).await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn token_near_expiry_triggers_refresh() {
        let svc = service();
        svc.cache.lock().await.insert(
            "user".into(),
            CachedToken {
                access_token: "stale".into(),
                // Inside the 60 s margin, so the cache entry no longer counts.
                expires_at: Instant::now() + Duration::from_secs(10),
            },
        );
        let creds = Credentials {
            username: "user".into(),
            password: "pw".into(),
        };
        // The refresh hits an unroutable address and must surface as a
        // transport error rather than returning the stale token.
        let err = svc.token(&creds).await.unwrap_err();
        assert!(matches!(err, IrzError::Transport(_)));
    }

    #[tokio::test]
    async fn clear_removes_the_entry() {
        let svc = service();
        svc.cache.lock().await.insert(
            "user".into(),
            CachedToken {
                access_token: "tok".into(),
                expires_at: Instant::now() + Duration::from_secs(300),
            },
        );
        svc.clear("user").await;
        assert!(svc.cache.lock().await.is_empty());
    }
}
