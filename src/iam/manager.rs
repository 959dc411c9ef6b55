// IAM token lifecycle management

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use tokio::sync::{Mutex, RwLock};

use crate::error::Result;

use super::request;
use super::types::{TokenInfo, DEFAULT_IAM_URL};

/// Construction options for [`IamTokenManager`]
#[derive(Debug, Clone, Default)]
pub struct IamOptions {
    /// API key exchanged for token grants
    pub api_key: Option<String>,

    /// Pre-obtained access token; when set the manager returns it verbatim
    /// and never contacts the identity endpoint
    pub access_token: Option<String>,

    /// Token endpoint override, for private or staging IAM instances
    pub url: Option<String>,
}

/// Where the next token comes from for a get_token call
enum TokenSource {
    /// Cached grant is still good
    Cached(String),
    /// No usable grant, exchange the API key
    Fetch,
    /// Grant is past its renewal point, use its refresh token
    Refresh(String),
}

/// IAM token manager
/// Caches the grant from the identity endpoint and renews it ahead of expiry,
/// thread-safe
#[derive(Debug)]
pub struct IamTokenManager {
    /// Token endpoint URL
    url: String,

    /// API key for the apikey grant
    api_key: Option<String>,

    /// Caller-managed token; once present it is returned verbatim
    user_access_token: Arc<RwLock<Option<String>>>,

    /// Most recent grant from the identity endpoint
    token_info: Arc<RwLock<Option<TokenInfo>>>,

    /// Serializes fetch/refresh so concurrent callers share one round trip
    renew_guard: Mutex<()>,

    /// HTTP client for token requests
    client: Client,
}

impl IamTokenManager {
    /// Create a new IamTokenManager
    pub fn new(options: IamOptions) -> Result<Self> {
        let url = options.url.unwrap_or_else(|| DEFAULT_IAM_URL.to_string());

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            url,
            api_key: options.api_key,
            user_access_token: Arc::new(RwLock::new(options.access_token)),
            token_info: Arc::new(RwLock::new(None)),
            renew_guard: Mutex::new(()),
            client,
        })
    }

    /// Get a valid access token
    ///
    /// A caller-supplied token always wins. Otherwise the cached grant is
    /// served until its renewal point, then renewed with its refresh token,
    /// or fetched anew when no usable grant remains. At most one network
    /// round trip happens per call, and concurrent callers needing a renewal
    /// share a single request.
    pub async fn get_token(&self) -> Result<String> {
        {
            let user_token = self.user_access_token.read().await;
            if let Some(token) = user_token.as_ref() {
                return Ok(token.clone());
            }
        }

        let source = {
            let info = self.token_info.read().await;
            Self::token_source(info.as_ref(), Utc::now().timestamp())
        };
        if let TokenSource::Cached(token) = source {
            return Ok(token);
        }

        self.renew().await
    }

    /// Replace all token management with a caller-supplied token
    /// From this point get_token returns the given token and never contacts
    /// the identity endpoint
    pub async fn set_access_token(&self, access_token: String) {
        let mut user_token = self.user_access_token.write().await;
        *user_token = Some(access_token);
    }

    /// Decide where the next token comes from given the cached grant
    fn token_source(info: Option<&TokenInfo>, now: i64) -> TokenSource {
        match info {
            None => TokenSource::Fetch,
            Some(info) if info.access_token.is_empty() || info.is_refresh_token_expired(now) => {
                TokenSource::Fetch
            }
            Some(info) if info.is_expired(now) => TokenSource::Refresh(info.refresh_token.clone()),
            Some(info) => TokenSource::Cached(info.access_token.clone()),
        }
    }

    /// Fetch or refresh the grant, whichever the current state calls for
    async fn renew(&self) -> Result<String> {
        let _guard = self.renew_guard.lock().await;

        // The state may have moved while this caller waited for the guard:
        // another task can have stored a fresh grant, or a user token can
        // have been set. Re-run the decision before touching the network.
        {
            let user_token = self.user_access_token.read().await;
            if let Some(token) = user_token.as_ref() {
                return Ok(token.clone());
            }
        }

        let source = {
            let info = self.token_info.read().await;
            Self::token_source(info.as_ref(), Utc::now().timestamp())
        };

        let info = match source {
            TokenSource::Cached(token) => return Ok(token),
            TokenSource::Fetch => {
                let api_key = self.api_key.as_deref().unwrap_or_default();
                request::request_token(&self.client, &self.url, api_key).await?
            }
            TokenSource::Refresh(refresh_token) => {
                request::refresh_token(&self.client, &self.url, &refresh_token).await?
            }
        };

        tracing::info!("New IAM grant stored, expires at {}", info.expiration);

        let access_token = info.access_token.clone();
        {
            let mut cached = self.token_info.write().await;
            *cached = Some(info);
        }

        Ok(access_token)
    }

    /// Seed the cached grant directly, bypassing the identity endpoint
    /// Available in test builds and integration tests
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn seed_token_info(&self, info: TokenInfo) {
        let mut cached = self.token_info.write().await;
        *cached = Some(info);
    }

    /// Snapshot the cached grant
    /// Available in test builds and integration tests
    #[cfg(any(test, feature = "test-utils"))]
    pub async fn token_info(&self) -> Option<TokenInfo> {
        self.token_info.read().await.clone()
    }
}
