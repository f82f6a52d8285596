use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// All accounts of one integration, keyed by alias. Stored as
/// `<credentials_dir>/<integration>.json`.
pub type AccountCollection = BTreeMap<String, Account>;

/// A single credential record.
///
/// Credential fields are kept sparse: a field that was never answered is
/// absent rather than empty. Which fields appear depends on the scheme of
/// the referenced security definition (`username`/`password`, `api_key`,
/// or the OAuth2 token fields). Values written by other tools that are not
/// strings are preserved on save but never offered as credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    #[serde(rename = "securityDefinition", default)]
    pub security_definition: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Account {
    /// Build a new account from collected answers, dropping empty values.
    pub fn from_answers(security_definition: &str, answers: BTreeMap<String, String>) -> Self {
        let mut account = Account {
            security_definition: security_definition.to_string(),
            fields: BTreeMap::new(),
        };
        account.merge_answers(security_definition, answers);
        account
    }

    /// Overwrite fields with every non-empty answer. Fields not present in
    /// `answers` (or answered with an empty string) are left untouched.
    pub fn merge_answers(&mut self, security_definition: &str, answers: BTreeMap<String, String>) {
        for (key, value) in answers {
            if !value.is_empty() {
                self.fields.insert(key, Value::String(value));
            }
        }
        self.security_definition = security_definition.to_string();
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn set_field(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        if value.is_empty() {
            return;
        }
        self.fields.insert(key.to_string(), Value::String(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_answers_are_dropped() {
        let account = Account::from_answers(
            "oauth",
            answers(&[("access_token", "at"), ("refresh_token", ""), ("client_id", "")]),
        );

        assert_eq!(account.field("access_token"), Some("at"));
        assert!(!account.fields.contains_key("refresh_token"));
        assert!(!account.fields.contains_key("client_id"));
    }

    #[test]
    fn merge_keeps_fields_not_answered() {
        let mut account =
            Account::from_answers("oauth", answers(&[("access_token", "old"), ("client_id", "cid")]));
        account.merge_answers("oauth", answers(&[("access_token", "new"), ("client_id", "")]));

        assert_eq!(account.field("access_token"), Some("new"));
        assert_eq!(account.field("client_id"), Some("cid"));
    }

    #[test]
    fn serializes_flat_with_definition_name() {
        let account = Account::from_answers("api_key", answers(&[("api_key", "k")]));
        let json = serde_json::to_value(&account).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "securityDefinition": "api_key", "api_key": "k" })
        );
    }

    #[test]
    fn non_string_values_survive_but_are_not_credentials() {
        let mut account: Account = serde_json::from_value(serde_json::json!({
            "securityDefinition": "oauth",
            "access_token": "at",
            "expires_in": 3600,
            "offline": true
        }))
        .unwrap();

        assert_eq!(account.field("access_token"), Some("at"));
        assert_eq!(account.field("expires_in"), None);

        account.set_field("expires_in", "never");
        assert_eq!(account.field("expires_in"), Some("never"));
        assert_eq!(serde_json::to_value(&account).unwrap()["offline"], true);
    }

    #[test]
    fn missing_definition_name_loads_as_empty() {
        let account: Account = serde_json::from_value(serde_json::json!({ "api_key": "k" })).unwrap();

        assert_eq!(account.security_definition, "");
        assert_eq!(account.field("api_key"), Some("k"));
    }
}
