use std::sync::Arc;

use chrono::{Duration, Utc};
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;

use crate::{
    config::VantConfig,
    data_objects::{AccountDetails, AuthResponse, AuthToken, TransferPayload, TransferResponse},
    error::VantApiError,
};

/// Tokens are considered stale this long before their actual expiry, so a token never dies mid-request.
const EXPIRY_SLACK_SECS: i64 = 30;

//--------------------------------------      TokenCache     ---------------------------------------------------------
/// Holds the rail's bearer token together with its expiry. The cache is injected into [`VantApi`] (shared
/// between clones) and only ever read through [`TokenCache::get_or_refresh`], which refreshes under the
/// lock so concurrent callers cannot race two logins.
#[derive(Default)]
pub struct TokenCache {
    inner: Mutex<Option<AuthToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<String, VantApiError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<AuthToken, VantApiError>>,
    {
        let mut guard = self.inner.lock().await;
        if let Some(token) = guard.as_ref() {
            if token.expires_at > Utc::now() + Duration::seconds(EXPIRY_SLACK_SECS) {
                return Ok(token.token.clone());
            }
            trace!("🏦️ Cached rail token has expired");
        }
        let fresh = refresh().await?;
        let value = fresh.token.clone();
        *guard = Some(fresh);
        debug!("🏦️ Rail token refreshed");
        Ok(value)
    }
}

//--------------------------------------       VantApi       ---------------------------------------------------------
#[derive(Clone)]
pub struct VantApi {
    config: VantConfig,
    client: Arc<Client>,
    tokens: Arc<TokenCache>,
}

impl VantApi {
    pub fn new(config: VantConfig, tokens: Arc<TokenCache>) -> Result<Self, VantApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| VantApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client), tokens })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    async fn login(&self) -> Result<AuthToken, VantApiError> {
        let body = serde_json::json!({
            "client_id": self.config.client_id,
            "client_secret": self.config.client_secret.reveal(),
        });
        trace!("🏦️ Logging in to the rail");
        let response = self
            .client
            .post(self.url("/v1/auth/login"))
            .json(&body)
            .send()
            .await
            .map_err(|e| VantApiError::AuthFailed(e.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(VantApiError::AuthFailed(format!("status {status}: {message}")));
        }
        let auth = response.json::<AuthResponse>().await.map_err(|e| VantApiError::JsonError(e.to_string()))?;
        Ok(AuthToken { token: auth.token, expires_at: Utc::now() + Duration::seconds(auth.expires_in) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, VantApiError> {
        let token = self.tokens.get_or_refresh(|| self.login()).await?;
        let url = self.url(path);
        trace!("🏦️ Sending REST query: {url}");
        let mut req = self.client.request(method, url).bearer_auth(token);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| VantApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("🏦️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| VantApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| VantApiError::RequestError(e.to_string()))?;
            Err(VantApiError::QueryError { status, message })
        }
    }

    /// Resolves a beneficiary account before a transfer is attempted.
    pub async fn verify_account(&self, account_number: &str, bank_code: &str) -> Result<AccountDetails, VantApiError> {
        debug!("🏦️ Verifying account {account_number} at bank {bank_code}");
        let params = [("account_number", account_number), ("bank_code", bank_code)];
        let details =
            self.rest_query::<AccountDetails, ()>(Method::GET, "/v1/transfer/verify-account", &params, None).await?;
        info!("🏦️ Account {account_number} resolved to {}", details.account_name);
        Ok(details)
    }

    /// Hands an outward transfer to the rail.
    pub async fn initiate_transfer(&self, payload: TransferPayload) -> Result<TransferResponse, VantApiError> {
        debug!("🏦️ Initiating transfer {} of {}", payload.reference, payload.amount);
        let response =
            self.rest_query::<TransferResponse, _>(Method::POST, "/v1/transfer", &[], Some(payload)).await?;
        info!("🏦️ Transfer {} answered with status '{}'", response.reference, response.status);
        Ok(response)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn token_cache_refreshes_only_when_stale() {
        let cache = TokenCache::new();
        let fresh = || async {
            Ok(AuthToken { token: "tok-1".to_string(), expires_at: Utc::now() + Duration::hours(1) })
        };
        assert_eq!(cache.get_or_refresh(fresh).await.unwrap(), "tok-1");
        // the cached token is still valid, so the refresher must not run
        let boom = || async { Err(VantApiError::AuthFailed("should not be called".to_string())) };
        assert_eq!(cache.get_or_refresh(boom).await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn token_cache_discards_expired_tokens() {
        let cache = TokenCache::new();
        let stale = || async {
            Ok(AuthToken { token: "stale".to_string(), expires_at: Utc::now() - Duration::seconds(1) })
        };
        assert_eq!(cache.get_or_refresh(stale).await.unwrap(), "stale");
        let fresh = || async {
            Ok(AuthToken { token: "fresh".to_string(), expires_at: Utc::now() + Duration::hours(1) })
        };
        assert_eq!(cache.get_or_refresh(fresh).await.unwrap(), "fresh");
    }
}
