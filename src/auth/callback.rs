use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tiny_http::{Header, Request, Response, Server, StatusCode};
use tracing::{debug, info, warn};

use super::oauth::CodeExchange;
use crate::error::{AuthError, Result};
use crate::storage::{display_path, AccountCollection, CredentialStore};

const LANDING_PAGE: &str = include_str!("../../assets/oauth_callback.html");

/// How long the listener stays up after the 302 for the browser to load
/// the landing page at the redirect target.
const FOLLOW_UP_GRACE: Duration = Duration::from_secs(5);

/// Where redeemed tokens are written.
pub struct TokenDestination<'a> {
    pub store: &'a CredentialStore,
    pub integration: &'a str,
    pub alias: &'a str,
    pub accounts: &'a mut AccountCollection,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// A bare request arrived first; the landing page was served and no
    /// exchange happened.
    LandingPageServed,
    TokensSaved { path: PathBuf },
}

enum ServerState {
    Listening,
    Redeeming { request: Request, query: String },
    /// Tokens are saved; waiting for the browser to follow the redirect.
    Finishing { path: PathBuf },
    Closed(CallbackOutcome),
}

/// Single-use local listener that completes one authorization-code redirect.
pub struct OAuthCallbackServer {
    server: Server,
    port: u16,
    timeout: Duration,
    follow_up_grace: Duration,
}

impl OAuthCallbackServer {
    /// Listen on `127.0.0.1:<port>`; port 0 picks a free one.
    pub fn bind(port: u16, timeout: Duration) -> Result<Self> {
        let addr = format!("127.0.0.1:{}", port);
        let server = Server::http(&addr).map_err(|e| AuthError::ListenerBind {
            addr: addr.clone(),
            reason: e.to_string(),
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .unwrap_or(port);

        debug!(port, "OAuth callback listener bound");
        Ok(Self {
            server,
            port,
            timeout,
            follow_up_grace: FOLLOW_UP_GRACE.min(timeout),
        })
    }

    pub fn with_follow_up_grace(mut self, grace: Duration) -> Self {
        self.follow_up_grace = grace;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Serve until one meaningful request has been handled, then close.
    /// After a successful exchange one more request is answered with the
    /// landing page so the browser can show the saved tokens.
    ///
    /// `issued_state` is compared with the redirect's `state` for logging
    /// only; a mismatch does not reject the redirect.
    pub fn run(
        self,
        exchange: &CodeExchange,
        issued_state: &str,
        mut destination: TokenDestination<'_>,
    ) -> Result<CallbackOutcome> {
        let deadline = Instant::now() + self.timeout;
        let mut state = ServerState::Listening;

        loop {
            state = match state {
                ServerState::Listening => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    let request = match self.server.recv_timeout(remaining) {
                        Ok(Some(request)) => request,
                        Ok(None) => return Err(AuthError::OAuthTimeout(self.timeout)),
                        Err(e) => return Err(AuthError::Listener(e)),
                    };

                    let query = query_of(request.url()).to_string();
                    if query.is_empty() {
                        serve_landing_page(request)?;
                        ServerState::Closed(CallbackOutcome::LandingPageServed)
                    } else {
                        ServerState::Redeeming { request, query }
                    }
                }
                ServerState::Redeeming { request, query } => {
                    let path = redeem(request, &query, exchange, issued_state, &mut destination)?;
                    ServerState::Finishing { path }
                }
                ServerState::Finishing { path } => {
                    match self.server.recv_timeout(self.follow_up_grace) {
                        Ok(Some(request)) => {
                            if let Err(e) = serve_landing_page(request) {
                                debug!(error = %e, "failed to serve landing page after redirect");
                            }
                        }
                        Ok(None) => debug!("browser did not follow the redirect"),
                        Err(e) => debug!(error = %e, "listener failed after tokens were saved"),
                    }
                    ServerState::Closed(CallbackOutcome::TokensSaved { path })
                }
                ServerState::Closed(outcome) => {
                    info!(port = self.port, "OAuth callback listener closed");
                    return Ok(outcome);
                }
            };
        }
    }
}

fn query_of(url: &str) -> &str {
    url.split_once('?').map(|(_, query)| query).unwrap_or("")
}

fn serve_landing_page(request: Request) -> Result<()> {
    debug!("serving OAuth landing page");
    let response = Response::from_string(LANDING_PAGE)
        .with_status_code(StatusCode(200))
        .with_header(header("Content-Type", "text/html; charset=utf-8")?);
    request.respond(response).map_err(AuthError::Listener)
}

fn redeem(
    request: Request,
    query: &str,
    exchange: &CodeExchange,
    issued_state: &str,
    destination: &mut TokenDestination<'_>,
) -> Result<PathBuf> {
    let params: HashMap<String, String> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();

    if params.get("state").map(String::as_str) != Some(issued_state) {
        warn!(
            integration = destination.integration,
            "redirect state does not match the issued authorization request"
        );
    }

    let Some(code) = params.get("code").filter(|code| !code.is_empty()) else {
        let reason = match params.get("error") {
            Some(error) => format!("authorization was not granted: {}", error),
            None => "redirect did not include an authorization code".to_string(),
        };
        respond_failure(request, 400, "Authorization failed. Return to the terminal for details.");
        return Err(AuthError::Provider {
            url: exchange.token_url.clone(),
            reason,
        });
    };

    info!(
        integration = destination.integration,
        alias = destination.alias,
        token_url = %exchange.token_url,
        "redeeming authorization code"
    );
    let tokens = match exchange.redeem(code) {
        Ok(tokens) => tokens,
        Err(e) => {
            respond_failure(request, 502, "Token exchange failed. Return to the terminal for details.");
            return Err(e);
        }
    };

    let account = destination
        .accounts
        .get_mut(destination.alias)
        .ok_or_else(|| AuthError::AccountNotFound {
            integration: destination.integration.to_string(),
            alias: destination.alias.to_string(),
        })?;
    account.set_field("access_token", tokens.access_token);
    if let Some(refresh_token) = tokens.refresh_token {
        account.set_field("refresh_token", refresh_token);
    }
    let location = format!(
        "/#access_token={}&refresh_token={}&saved=true",
        urlencoding::encode(account.field("access_token").unwrap_or_default()),
        urlencoding::encode(account.field("refresh_token").unwrap_or_default()),
    );

    eprintln!(
        "Saving credentials to {}",
        display_path(&destination.store.path_for(destination.integration))
    );
    let path = match destination.store.save(destination.integration, destination.accounts) {
        Ok(path) => path,
        Err(e) => {
            respond_failure(request, 500, "Saving credentials failed. Return to the terminal for details.");
            return Err(e);
        }
    };

    let response = Response::empty(StatusCode(302)).with_header(header("Location", &location)?);
    request.respond(response).map_err(AuthError::Listener)?;
    Ok(path)
}

fn respond_failure(request: Request, status: u16, message: &str) {
    let response = Response::from_string(message).with_status_code(StatusCode(status));
    if let Err(e) = request.respond(response) {
        debug!(error = %e, "failed to report callback failure to browser");
    }
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name.as_bytes(), value.as_bytes()).map_err(|()| {
        AuthError::Listener(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid {} header", name),
        ))
    })
}
