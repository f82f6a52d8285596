use std::time::Duration;

use rand::Rng;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::error::{AuthError, Result};
use crate::integration::SecurityDefinition;

const EXCHANGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Address the provider redirects back to.
pub fn redirect_uri(port: u16) -> String {
    format!("http://localhost:{}", port)
}

/// A provider authorization URL together with the `state` it carries.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
}

/// Build the authorization-code request for `definition`.
///
/// Only the first declared scope is requested.
pub fn authorization_request(
    definition: &SecurityDefinition,
    client_id: &str,
    redirect_uri: &str,
) -> Result<AuthorizationRequest> {
    let base = definition.authorization_url.as_deref().ok_or_else(|| {
        AuthError::configuration(format!(
            "security definition '{}' has no authorizationUrl",
            definition.name
        ))
    })?;
    let mut url = Url::parse(base).map_err(|e| {
        AuthError::configuration(format!(
            "security definition '{}' has an invalid authorizationUrl: {}",
            definition.name, e
        ))
    })?;

    let state = new_state();
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("client_id", client_id)
            .append_pair("access_type", "offline");
        if let Some(scope) = definition.scopes.first() {
            debug!(definition = %definition.name, scope = %scope.name, description = %scope.description, "requesting first declared scope");
            query.append_pair("scope", &scope.name);
        }
        query.append_pair("state", &state);
    }

    Ok(AuthorizationRequest {
        url: url.to_string(),
        state,
    })
}

fn new_state() -> String {
    rand::thread_rng().gen::<u64>().to_string()
}

#[derive(Debug, Clone)]
pub struct TokenBundle {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Client credentials needed to redeem an authorization code.
#[derive(Debug, Clone)]
pub struct CodeExchange {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl CodeExchange {
    /// POST the code to the token endpoint and read the tokens it returns.
    pub fn redeem(&self, code: &str) -> Result<TokenBundle> {
        let transport = |source| AuthError::Transport {
            url: self.token_url.clone(),
            source,
        };
        let rejected = |reason: String| AuthError::Provider {
            url: self.token_url.clone(),
            reason,
        };

        let mut builder = reqwest::blocking::Client::builder().timeout(EXCHANGE_TIMEOUT);
        if is_loopback(&self.token_url) {
            builder = builder.no_proxy();
        }
        let client = builder.build().map_err(transport)?;

        let params = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = client
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .map_err(transport)?;
        let status = response.status();
        let body = response.text().map_err(transport)?;
        let parsed = serde_json::from_str::<TokenResponse>(&body).ok();

        if let Some(error) = parsed.as_ref().and_then(|r| r.error.as_deref()) {
            let description = parsed
                .as_ref()
                .and_then(|r| r.error_description.as_deref())
                .unwrap_or_default();
            return Err(rejected(format!("{} {}", error, description).trim_end().to_string()));
        }
        if !status.is_success() {
            return Err(rejected(format!("HTTP {}", status)));
        }

        let response = parsed.ok_or_else(|| rejected("response was not JSON".to_string()))?;
        let access_token = response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| rejected("response did not include access_token".to_string()))?;

        Ok(TokenBundle {
            access_token,
            refresh_token: response.refresh_token.filter(|token| !token.is_empty()),
        })
    }
}

fn is_loopback(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(str::to_string))
        .is_some_and(|host| matches!(host.as_str(), "localhost" | "127.0.0.1" | "[::1]"))
}
