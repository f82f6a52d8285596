use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::callback::{CallbackOutcome, OAuthCallbackServer, TokenDestination};
use super::oauth::{authorization_request, redirect_uri, CodeExchange};
use super::questions::{alias_question, questions_for, with_defaults, AnswerCollector, ALIAS_KEY};
use crate::error::{AuthError, Result};
use crate::integration::{apply_provider_fixups, SchemeType, SecurityDefinition};
use crate::storage::{display_path, Account, AccountCollection, CredentialStore};

/// What a flow operates on: one integration, its chosen definition, and
/// the store its accounts live in.
pub struct FlowContext<'a> {
    pub integration: &'a str,
    pub definition: &'a SecurityDefinition,
    pub store: &'a CredentialStore,
    pub oauth_port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Saved {
    pub alias: String,
    pub path: PathBuf,
}

/// Ask for credentials by hand and store them.
///
/// With an alias the existing account is edited in place, otherwise a new
/// alias is requested. A new alias that already exists replaces that account.
pub fn collect_credentials(
    ctx: &FlowContext<'_>,
    mut accounts: AccountCollection,
    alias: Option<&str>,
    collector: &mut dyn AnswerCollector,
) -> Result<Saved> {
    let definition = ctx.definition;
    let mut questions = questions_for(definition.scheme);

    if let Some(alias) = alias {
        let account = accounts.get(alias).ok_or_else(|| AuthError::AccountNotFound {
            integration: ctx.integration.to_string(),
            alias: alias.to_string(),
        })?;
        if let Some(url) = manual_token_url(ctx, account) {
            eprintln!("You can retrieve an access token here:");
            println!("{}", url);
        }
        questions = with_defaults(questions, account);
    }

    let answers = collector.ask(&questions)?;

    let alias = match alias {
        Some(alias) => {
            if let Some(account) = accounts.get_mut(alias) {
                account.merge_answers(&definition.name, answers);
            }
            alias.to_string()
        }
        None => {
            let alias = collector
                .ask(&[alias_question()])?
                .remove(ALIAS_KEY)
                .map(|alias| alias.trim().to_string())
                .unwrap_or_default();
            if alias.is_empty() {
                return Err(AuthError::configuration("account alias must not be empty"));
            }
            if accounts.contains_key(&alias) {
                warn!(integration = ctx.integration, alias = %alias, "replacing existing account");
            }
            accounts.insert(alias.clone(), Account::from_answers(&definition.name, answers));
            alias
        }
    };

    eprintln!(
        "Saving credentials to {}",
        display_path(&ctx.store.path_for(ctx.integration))
    );
    let path = ctx.store.save(ctx.integration, &accounts)?;
    info!(integration = ctx.integration, alias = %alias, definition = %definition.name, "account saved");

    Ok(Saved { alias, path })
}

/// Authorization URL offered when editing an oauth2 account by hand.
fn manual_token_url(ctx: &FlowContext<'_>, account: &Account) -> Option<String> {
    if ctx.definition.scheme != SchemeType::OAuth2 {
        return None;
    }
    let Some(client_id) = account.field("client_id") else {
        debug!(integration = ctx.integration, "no client_id on file, skipping authorization URL");
        return None;
    };
    match authorization_request(ctx.definition, client_id, &redirect_uri(ctx.oauth_port)) {
        Ok(request) => Some(request.url),
        Err(e) => {
            debug!(integration = ctx.integration, error = %e, "cannot build authorization URL");
            None
        }
    }
}

/// Run the local OAuth callback server to fetch fresh tokens for an
/// existing account that already has client credentials on file.
pub fn generate_token(
    ctx: &FlowContext<'_>,
    mut accounts: AccountCollection,
    alias: &str,
    timeout: Duration,
) -> Result<CallbackOutcome> {
    if ctx.definition.scheme != SchemeType::OAuth2 {
        return Err(AuthError::configuration(format!(
            "token generation needs an oauth2 security definition, but '{}' is {}",
            ctx.definition.name, ctx.definition.scheme
        )));
    }

    let mut definition = ctx.definition.clone();
    apply_provider_fixups(ctx.integration, &mut definition);
    if let Some(flow) = definition.flow.as_deref() {
        if !matches!(flow, "accessCode" | "authorizationCode" | "code") {
            warn!(
                integration = ctx.integration,
                definition = %definition.name,
                flow,
                "definition declares a different flow; using the authorization-code exchange"
            );
        }
    }

    let account = accounts.get(alias).ok_or_else(|| AuthError::AccountNotFound {
        integration: ctx.integration.to_string(),
        alias: alias.to_string(),
    })?;
    let missing = |field: &str| {
        AuthError::configuration(format!(
            "account '{}' has no {}; add it with `apiauth authenticate {} --as {}`",
            alias, field, ctx.integration, alias
        ))
    };
    let client_id = account.field("client_id").ok_or_else(|| missing("client_id"))?.to_string();
    let client_secret = account
        .field("client_secret")
        .ok_or_else(|| missing("client_secret"))?
        .to_string();
    let token_url = definition.token_url.clone().ok_or_else(|| {
        AuthError::configuration(format!(
            "security definition '{}' has no tokenUrl",
            definition.name
        ))
    })?;

    let server = OAuthCallbackServer::bind(ctx.oauth_port, timeout)?;
    let redirect = redirect_uri(server.port());
    let request = authorization_request(&definition, &client_id, &redirect)?;

    eprintln!("Visit this url to retrieve your access and refresh tokens:");
    println!("{}", request.url);
    info!(integration = ctx.integration, alias, port = server.port(), "waiting for OAuth redirect");

    let exchange = CodeExchange {
        token_url,
        client_id,
        client_secret,
        redirect_uri: redirect,
    };
    server.run(
        &exchange,
        &request.state,
        TokenDestination {
            store: ctx.store,
            integration: ctx.integration,
            alias,
            accounts: &mut accounts,
        },
    )
}
