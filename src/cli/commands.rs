use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use super::prompt::TerminalCollector;
use crate::auth::{self, AnswerCollector, CallbackOutcome, FlowContext};
use crate::config::Settings;
use crate::error::AuthError;
use crate::integration::{FsIntegrationLoader, IntegrationLoader};
use crate::storage::{display_path, CredentialStore};

/// How `authenticate` was invoked.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticateArgs<'a> {
    pub integration: &'a str,
    /// Edit this existing account instead of creating one.
    pub alias: Option<&'a str>,
    /// Fetch tokens through the local OAuth callback server.
    pub generate_token: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authenticated {
    Saved { alias: String, path: PathBuf },
    LandingPageServed,
}

pub fn cmd_authenticate(settings: &Settings, args: AuthenticateArgs<'_>) -> Result<()> {
    let loader = FsIntegrationLoader::new(&settings.integrations_dir);
    let mut collector = TerminalCollector::new();

    let outcome = authenticate(settings, &loader, &mut collector, args)
        .with_context(|| format!("authenticating {}", args.integration))?;

    match outcome {
        Authenticated::Saved { alias, path } => {
            eprintln!(
                "Account '{}' for {} is stored in {}.",
                alias,
                args.integration,
                display_path(&path)
            );
        }
        Authenticated::LandingPageServed => {
            eprintln!("Callback page served before any redirect arrived; no tokens were saved.");
            eprintln!("Run the command again and open the printed URL instead.");
        }
    }
    Ok(())
}

/// Load the integration, pick a security definition, and run the
/// matching flow. Nothing is written until a definition has been chosen.
pub fn authenticate(
    settings: &Settings,
    loader: &dyn IntegrationLoader,
    collector: &mut dyn AnswerCollector,
    args: AuthenticateArgs<'_>,
) -> crate::error::Result<Authenticated> {
    if args.generate_token && args.alias.is_none() {
        return Err(AuthError::configuration(
            "--generate-token edits an existing account; pass --as <alias>",
        ));
    }

    let integration = loader.load(args.integration)?;
    let store = CredentialStore::new(&settings.credentials_dir);
    let accounts = store.load(&integration.name)?;

    let definition = auth::select_definition(&integration, &accounts, args.alias, collector)?;
    info!(
        integration = %integration.name,
        alias = args.alias.unwrap_or_default(),
        definition = %definition.name,
        scheme = %definition.scheme,
        credentials = %store.dir().display(),
        "authenticating"
    );

    store.ensure_dir()?;
    let ctx = FlowContext {
        integration: &integration.name,
        definition: &definition,
        store: &store,
        oauth_port: settings.oauth_port,
    };

    match args.alias {
        Some(alias) if args.generate_token => {
            match auth::generate_token(&ctx, accounts, alias, settings.oauth_timeout)? {
                CallbackOutcome::TokensSaved { path } => Ok(Authenticated::Saved {
                    alias: alias.to_string(),
                    path,
                }),
                CallbackOutcome::LandingPageServed => Ok(Authenticated::LandingPageServed),
            }
        }
        alias => {
            let saved = auth::collect_credentials(&ctx, accounts, alias, collector)?;
            Ok(Authenticated::Saved {
                alias: saved.alias,
                path: saved.path,
            })
        }
    }
}
