//! Access token refresh against the identity provider.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use oauth2::basic::BasicClient;
use oauth2::{
    AuthType, ClientId, ClientSecret, EndpointNotSet, EndpointSet, RefreshToken,
    RequestTokenError, TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use liftsync_common::{Error, Result, Secret, DEFAULT_BUFFER_WINDOW_SECS};

/// OAuth2 client ID placeholder; real values come from configuration.
const DEFAULT_CLIENT_ID: &str = "YOUR_CLIENT_ID";
const DEFAULT_CLIENT_SECRET: &str = "YOUR_CLIENT_SECRET";
/// Google OAuth2 token endpoint.
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
/// Lifetime assumed when the provider omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Configuration for talking to the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    /// Lead time before expiry at which a token is refreshed.
    pub buffer_window_secs: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            client_secret: DEFAULT_CLIENT_SECRET.to_string(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
            buffer_window_secs: DEFAULT_BUFFER_WINDOW_SECS,
        }
    }
}

impl AuthConfig {
    pub fn buffer_window(&self) -> Duration {
        Duration::seconds(self.buffer_window_secs)
    }
}

/// Result of a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: Secret,
    /// Present only when the provider rotated the refresh token.
    pub refresh_token: Option<Secret>,
    pub expires_at: DateTime<Utc>,
}

/// Exchanges a refresh token for a new access token.
#[async_trait]
pub trait RefreshClient: Send + Sync {
    /// # Errors
    /// - `AuthExpired` if the provider rejected the refresh token
    /// - `RemoteUnavailable` on transport failures
    async fn refresh(&self, refresh_token: &Secret) -> Result<RefreshedToken>;
}

type TokenClient =
    BasicClient<EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Refresh client speaking the standard OAuth2 refresh grant.
///
/// Sends `client_id`, `client_secret`, `grant_type=refresh_token` and
/// `refresh_token` in the request body.
pub struct OAuthRefreshClient {
    client: TokenClient,
    http: reqwest::Client,
}

impl OAuthRefreshClient {
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let token_url = TokenUrl::new(config.token_url.clone())
            .map_err(|e| Error::InvalidInput(format!("Invalid token URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_type(AuthType::RequestBody)
            .set_token_uri(token_url);

        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::RemoteUnavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, http })
    }
}

#[async_trait]
impl RefreshClient for OAuthRefreshClient {
    async fn refresh(&self, refresh_token: &Secret) -> Result<RefreshedToken> {
        let response = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.expose().to_string()))
            .request_async(&self.http)
            .await;

        let token = match response {
            Ok(token) => token,
            Err(RequestTokenError::ServerResponse(rejection)) => {
                warn!("Identity provider rejected refresh token: {}", rejection);
                return Err(Error::AuthExpired(format!(
                    "Refresh token rejected: {}",
                    rejection
                )));
            }
            Err(e) => {
                return Err(Error::RemoteUnavailable(format!("Token refresh failed: {}", e)));
            }
        };

        let expires_in = token
            .expires_in()
            .unwrap_or_else(|| std::time::Duration::from_secs(DEFAULT_EXPIRES_IN_SECS));
        let expires_at =
            Utc::now() + Duration::from_std(expires_in).unwrap_or_else(|_| Duration::hours(1));

        info!("Access token refreshed");
        Ok(RefreshedToken {
            access_token: Secret::new(token.access_token().secret().clone()),
            refresh_token: token.refresh_token().map(|t| Secret::new(t.secret().clone())),
            expires_at,
        })
    }
}
