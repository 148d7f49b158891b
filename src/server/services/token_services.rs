use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    config::ProviderSettings,
    models::{AuthResponse, AuthToken},
    server::{
        error::{AppResult, Error},
        utils::fetch_utils::{DynRemoteFetcher, url_encode},
    },
};

/// hashes are good for 4 hours upstream, refresh a little before that so a stream never starts
/// on a signature that's about to die
pub const TOKEN_LIFETIME_MS: i64 = 14_100_000;

struct TokenState {
    settings: ProviderSettings,
    token: Option<AuthToken>,
    // bumped on every reconfigure, lets callers tell which account a token belongs to
    generation: u64,
}

/// settings, signature and generation taken from one critical section, they always belong to
/// the same account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorization {
    pub settings: ProviderSettings,
    pub token: String,
    pub generation: u64,
}

/// caches the stream signature for the configured account
///
/// the lock is held across the refresh so concurrent requests that all see an expired token end
/// up waiting on a single hash api call instead of racing their own
pub struct TokenCache {
    fetcher: DynRemoteFetcher,
    auth_url: String,
    mma_auth_url: String,
    state: Mutex<TokenState>,
}

impl TokenCache {
    pub fn new(
        fetcher: DynRemoteFetcher,
        auth_url: String,
        mma_auth_url: String,
        settings: ProviderSettings,
    ) -> Self {
        Self {
            fetcher,
            auth_url,
            mma_auth_url,
            state: Mutex::new(TokenState {
                settings,
                token: None,
                generation: 0,
            }),
        }
    }

    /// returns a signature valid at `now`, refreshing inline when there isn't one
    ///
    /// a failed refresh keeps whatever was cached before, so the caller gets the stale
    /// signature if there is one and an error only if we never had one
    pub async fn get_token(&self, now: DateTime<Utc>) -> AppResult<String> {
        self.authorize(now).await.map(|auth| auth.token)
    }

    /// same as `get_token`, plus the settings the signature was issued for
    pub async fn authorize(&self, now: DateTime<Utc>) -> AppResult<Authorization> {
        let mut state = self.state.lock().await;
        let token = self.current_or_refreshed(&mut state, now).await?;

        Ok(Authorization {
            settings: state.settings.clone(),
            token,
            generation: state.generation,
        })
    }

    async fn current_or_refreshed(
        &self,
        state: &mut TokenState,
        now: DateTime<Utc>,
    ) -> AppResult<String> {
        if let Some(token) = state.token.as_ref().filter(|t| t.is_valid_at(now)) {
            debug!("using cached signature (expires {})", token.expires_at);
            return Ok(token.token.clone());
        }

        let refreshed = self.refresh(&state.settings).await;
        match refreshed {
            Ok(hash) => {
                let expires_at = now + Duration::milliseconds(TOKEN_LIFETIME_MS);
                info!("signature refreshed, valid until {}", expires_at);
                state.token = Some(AuthToken {
                    token: hash.clone(),
                    expires_at,
                });
                Ok(hash)
            }
            Err(e) => match &state.token {
                Some(stale) => {
                    warn!("signature refresh failed, reusing stale signature: {}", e);
                    Ok(stale.token.clone())
                }
                None => {
                    error!("signature refresh failed and nothing is cached: {}", e);
                    Err(e)
                }
            },
        }
    }

    /// swaps the account and drops the cached signature in the same critical section, returns
    /// the new generation
    pub async fn reconfigure(&self, settings: ProviderSettings) -> u64 {
        let mut state = self.state.lock().await;
        state.settings = settings;
        state.token = None;
        state.generation += 1;
        info!(
            "provider settings changed (generation {}), cached signature dropped",
            state.generation
        );
        state.generation
    }

    pub async fn cached(&self) -> Option<AuthToken> {
        self.state.lock().await.token.clone()
    }

    /// the two provider families use different login endpoints with the same parameters
    pub fn auth_endpoint(&self, settings: &ProviderSettings) -> String {
        let base = if settings.service.contains("mma") {
            &self.mma_auth_url
        } else {
            &self.auth_url
        };

        format!(
            "{}?username={}&password={}&site={}",
            base,
            url_encode(&settings.username),
            url_encode(&settings.password),
            url_encode(&settings.service)
        )
    }

    async fn refresh(&self, settings: &ProviderSettings) -> AppResult<String> {
        let endpoint = self.auth_endpoint(settings);
        debug!("requesting new signature for service {}", settings.service);

        let json = self
            .fetcher
            .fetch_json(&endpoint)
            .await
            .ok_or_else(|| Error::Transport("hash api unreachable".to_string()))?;

        let response: AuthResponse = serde_json::from_value(json)
            .map_err(|e| Error::Parse(format!("unexpected hash api response: {}", e)))?;

        if !response.is_success() {
            return Err(Error::Auth(format!(
                "hash api answered code {:?} ({})",
                response.code, response.error
            )));
        }

        Ok(response.hash)
    }
}
