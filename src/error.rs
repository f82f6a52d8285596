use std::path::PathBuf;
use std::time::Duration;

/// Broad failure categories. Every category is terminal to the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Store,
    Network,
    Provider,
    Interaction,
}

impl ErrorKind {
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Configuration => 2,
            ErrorKind::Store => 3,
            ErrorKind::Network => 4,
            ErrorKind::Provider => 5,
            ErrorKind::Interaction => 6,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("no security definitions found for {integration}")]
    NoSecurityDefinitions { integration: String },

    #[error("account '{alias}' not found for {integration}")]
    AccountNotFound { integration: String, alias: String },

    #[error("security definition '{definition}' (used by account '{alias}') not found for {integration}")]
    SecurityDefinitionNotFound {
        integration: String,
        alias: String,
        definition: String,
    },

    #[error("failed to load integration '{name}': {reason}")]
    IntegrationLoad { name: String, reason: String },

    #[error("{0}")]
    Configuration(String),

    #[error("credential store {} is not valid JSON: {source}", path.display())]
    MalformedStore {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read credential store {}: {source}", path.display())]
    StoreRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write credential store {}: {source}", path.display())]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to start OAuth callback listener on {addr}: {reason}")]
    ListenerBind { addr: String, reason: String },

    #[error("OAuth callback listener failed: {0}")]
    Listener(#[source] std::io::Error),

    #[error("token request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token endpoint {url} rejected the exchange: {reason}")]
    Provider { url: String, reason: String },

    #[error("no OAuth redirect arrived within {}s", .0.as_secs())]
    OAuthTimeout(Duration),

    #[error("failed to read {what}: {reason}")]
    Prompt { what: String, reason: String },
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::NoSecurityDefinitions { .. }
            | AuthError::AccountNotFound { .. }
            | AuthError::SecurityDefinitionNotFound { .. }
            | AuthError::IntegrationLoad { .. }
            | AuthError::Configuration(_) => ErrorKind::Configuration,
            AuthError::MalformedStore { .. }
            | AuthError::StoreRead { .. }
            | AuthError::StoreWrite { .. } => ErrorKind::Store,
            AuthError::ListenerBind { .. }
            | AuthError::Listener(_)
            | AuthError::Transport { .. }
            | AuthError::OAuthTimeout(_) => ErrorKind::Network,
            AuthError::Provider { .. } => ErrorKind::Provider,
            AuthError::Prompt { .. } => ErrorKind::Interaction,
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        AuthError::Configuration(message.into())
    }
}

pub type Result<T> = std::result::Result<T, AuthError>;
