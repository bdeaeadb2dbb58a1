//! OAuth 2.0 token exchange against the platform's permission endpoint.
//!
//! Covers authorization-URL construction, code-for-token exchange, and
//! refresh. The browser-side authorization flow itself is out of scope.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::{Client, Url};
use serde::Deserialize;

/// Default OAuth endpoint base.
pub const DEFAULT_AUTH_BASE_URL: &str = "https://www.coze.com/api/permission/oauth2";

/// Scopes requested when the caller does not specify any.
pub const DEFAULT_SCOPES: &[&str] = &["workflows:read", "workflows:execute"];

#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_base_url: String,
}

impl OAuthConfig {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: redirect_uri.into(),
            auth_base_url: DEFAULT_AUTH_BASE_URL.to_string(),
        }
    }
}

/// Token material returned by the exchange and refresh operations.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds as reported by the server.
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// When the token was obtained; filled in by the client, not the server.
    #[serde(skip, default = "Utc::now")]
    pub obtained_at: DateTime<Utc>,
}

impl TokenSet {
    /// Whether the token expires within the given margin (or already has).
    /// Tokens without a reported lifetime are assumed valid.
    pub fn expires_within(&self, margin: std::time::Duration) -> bool {
        match self.expires_in {
            Some(secs) => {
                let expires_at = self.obtained_at + ChronoDuration::seconds(secs);
                let margin = ChronoDuration::from_std(margin).unwrap_or(ChronoDuration::zero());
                Utc::now() + margin >= expires_at
            }
            None => false,
        }
    }
}

pub struct OAuthClient {
    config: OAuthConfig,
    client: Client,
}

impl OAuthClient {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        if config.client_id.is_empty() {
            bail!("OAuth client_id must not be empty");
        }
        let client = Client::builder()
            .user_agent("cozectl")
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { config, client })
    }

    /// Builds the authorization URL the user must visit to grant access.
    pub fn authorize_url(&self, scopes: Option<&[&str]>, state: &str) -> Result<Url> {
        let scopes = scopes.unwrap_or(DEFAULT_SCOPES);
        let mut url = Url::parse(&format!("{}/authorize", self.config.auth_base_url))
            .context("Invalid OAuth base URL")?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &scopes.join(" "))
            .append_pair("state", state);
        Ok(url)
    }

    /// Exchanges an authorization code for tokens.
    #[tracing::instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        self.token_request(&form).await
    }

    /// Obtains a fresh access token from a refresh token.
    #[tracing::instrument(skip(self, refresh_token))]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        let form = [
            ("grant_type", "refresh_token"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("refresh_token", refresh_token),
        ];
        self.token_request(&form).await
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<TokenSet> {
        let url = format!("{}/token", self.config.auth_base_url);

        let response = self
            .client
            .post(&url)
            .form(form)
            .send()
            .await
            .context("Failed to send token request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Token request failed with HTTP {}: {}", status.as_u16(), body);
        }

        let token_set: TokenSet = response
            .json()
            .await
            .context("Failed to parse token response")?;
        Ok(token_set)
    }
}
