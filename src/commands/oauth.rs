//! `oauth` commands: authorization URL, code exchange, token refresh.

use serde_json::json;

use super::HandlerOutput;
use crate::oauth::{OAuthClient, OAuthConfig, TokenSet};

pub fn authorize_url(config: OAuthConfig, scopes: Option<Vec<String>>, state: &str) -> HandlerOutput {
    let client = match OAuthClient::new(config) {
        Ok(client) => client,
        Err(e) => return HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    };

    let scope_refs: Option<Vec<&str>> = scopes
        .as_ref()
        .map(|s| s.iter().map(String::as_str).collect());

    match client.authorize_url(scope_refs.as_deref(), state) {
        Ok(url) => HandlerOutput::success(format!("Visit this URL to authorize: {}", url))
            .with_details(json!({"authorize_url": url.as_str()})),
        Err(e) => HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    }
}

#[tracing::instrument(skip(config, code))]
pub async fn exchange(config: OAuthConfig, code: &str) -> HandlerOutput {
    let client = match OAuthClient::new(config) {
        Ok(client) => client,
        Err(e) => return HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    };

    match client.exchange_code(code).await {
        Ok(tokens) => token_output("Token exchange succeeded", &tokens),
        Err(e) => HandlerOutput::failure(format!("Token exchange failed: {}", e), "authentication"),
    }
}

#[tracing::instrument(skip(config, refresh_token))]
pub async fn refresh(config: OAuthConfig, refresh_token: &str) -> HandlerOutput {
    let client = match OAuthClient::new(config) {
        Ok(client) => client,
        Err(e) => return HandlerOutput::failure(format!("Configuration error: {}", e), "config"),
    };

    match client.refresh(refresh_token).await {
        Ok(tokens) => token_output("Token refresh succeeded", &tokens),
        Err(e) => HandlerOutput::failure(format!("Token refresh failed: {}", e), "authentication"),
    }
}

fn token_output(message: &str, tokens: &TokenSet) -> HandlerOutput {
    HandlerOutput::success(message).with_details(json!({
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "expires_in": tokens.expires_in,
    }))
}
