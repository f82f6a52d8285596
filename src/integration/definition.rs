use std::fmt;

use serde::Deserialize;
use tracing::warn;

const GMAIL_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v4/token";

/// Authentication scheme of a security definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeType {
    Basic,
    ApiKey,
    OAuth2,
}

impl SchemeType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "basic" => Some(SchemeType::Basic),
            "apiKey" => Some(SchemeType::ApiKey),
            "oauth2" => Some(SchemeType::OAuth2),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SchemeType::Basic => "basic",
            SchemeType::ApiKey => "apiKey",
            SchemeType::OAuth2 => "oauth2",
        }
    }
}

impl fmt::Display for SchemeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub name: String,
    pub description: String,
}

/// A named authentication scheme declared by an integration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityDefinition {
    pub name: String,
    pub scheme: SchemeType,
    pub flow: Option<String>,
    pub authorization_url: Option<String>,
    pub token_url: Option<String>,
    /// In declaration order.
    pub scopes: Vec<Scope>,
}

impl SecurityDefinition {
    /// Label shown when the user has to pick between several definitions.
    pub fn choice_label(&self) -> String {
        format!("{} ({})", self.scheme, self.name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSecurityDefinition {
    #[serde(rename = "type")]
    scheme: String,
    flow: Option<String>,
    authorization_url: Option<String>,
    token_url: Option<String>,
    #[serde(default)]
    scopes: serde_json::Map<String, serde_json::Value>,
}

/// Parse a Swagger `securityDefinitions` object, keeping declaration order.
///
/// Schemes other than basic, apiKey and oauth2 are skipped.
pub fn parse_security_definitions(
    integration: &str,
    raw: &serde_json::Map<String, serde_json::Value>,
) -> Result<Vec<SecurityDefinition>, serde_json::Error> {
    let mut definitions = Vec::with_capacity(raw.len());

    for (name, value) in raw {
        let def: RawSecurityDefinition = serde_json::from_value(value.clone())?;
        let Some(scheme) = SchemeType::parse(&def.scheme) else {
            warn!(integration, definition = %name, scheme = %def.scheme, "skipping unsupported security definition");
            continue;
        };

        let scopes = def
            .scopes
            .into_iter()
            .map(|(name, description)| Scope {
                name,
                description: description.as_str().unwrap_or_default().to_string(),
            })
            .collect();

        definitions.push(SecurityDefinition {
            name: name.clone(),
            scheme,
            flow: def.flow,
            authorization_url: def.authorization_url,
            token_url: def.token_url,
            scopes,
        });
    }

    Ok(definitions)
}

/// Adjust definitions for providers whose published metadata does not work
/// with the authorization-code exchange as declared.
pub fn apply_provider_fixups(integration: &str, definition: &mut SecurityDefinition) {
    if integration == "gmail" {
        definition.flow = Some("accessCode".to_string());
        definition.token_url = Some(GMAIL_TOKEN_URL.to_string());
    }
}
