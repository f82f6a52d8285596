use tracing::debug;

use super::questions::AnswerCollector;
use crate::error::{AuthError, Result};
use crate::integration::{Integration, SecurityDefinition};
use crate::storage::AccountCollection;

const CHOICE_PROMPT: &str = "This API has multiple authentication flows. Which do you want to use?";

/// Pick the security definition to authenticate with.
///
/// With an alias, the account's own definition is the only candidate.
/// Otherwise a single definition is taken as is and several are offered
/// to the user.
pub fn select_definition(
    integration: &Integration,
    accounts: &AccountCollection,
    alias: Option<&str>,
    collector: &mut dyn AnswerCollector,
) -> Result<SecurityDefinition> {
    let definitions = &integration.security_definitions;
    if definitions.is_empty() {
        return Err(AuthError::NoSecurityDefinitions {
            integration: integration.name.clone(),
        });
    }

    if let Some(alias) = alias {
        let account = accounts.get(alias).ok_or_else(|| AuthError::AccountNotFound {
            integration: integration.name.clone(),
            alias: alias.to_string(),
        })?;

        return definitions
            .iter()
            .find(|def| def.name == account.security_definition)
            .cloned()
            .ok_or_else(|| AuthError::SecurityDefinitionNotFound {
                integration: integration.name.clone(),
                alias: alias.to_string(),
                definition: account.security_definition.clone(),
            });
    }

    if let [only] = definitions.as_slice() {
        debug!(integration = %integration.name, definition = %only.name, "single security definition");
        return Ok(only.clone());
    }

    let labels: Vec<String> = definitions.iter().map(SecurityDefinition::choice_label).collect();
    let index = collector.ask_choice(CHOICE_PROMPT, &labels)?;
    definitions.get(index).cloned().ok_or_else(|| AuthError::Prompt {
        what: "security definition".to_string(),
        reason: format!("choice {} out of range", index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::testing::ScriptedCollector;
    use crate::integration::SchemeType;
    use crate::storage::Account;

    fn definition(name: &str, scheme: SchemeType) -> SecurityDefinition {
        SecurityDefinition {
            name: name.into(),
            scheme,
            flow: None,
            authorization_url: None,
            token_url: None,
            scopes: Vec::new(),
        }
    }

    fn integration(definitions: Vec<SecurityDefinition>) -> Integration {
        Integration {
            name: "github".into(),
            security_definitions: definitions,
        }
    }

    fn accounts_with(alias: &str, definition: &str) -> AccountCollection {
        let mut accounts = AccountCollection::new();
        accounts.insert(
            alias.into(),
            Account {
                security_definition: definition.into(),
                ..Default::default()
            },
        );
        accounts
    }

    #[test]
    fn empty_definitions_fail() {
        let mut collector = ScriptedCollector::default();
        let err = select_definition(&integration(vec![]), &AccountCollection::new(), None, &mut collector)
            .unwrap_err();
        assert!(matches!(err, AuthError::NoSecurityDefinitions { .. }));
    }

    #[test]
    fn single_definition_is_auto_selected() {
        let mut collector = ScriptedCollector::default();
        let def = select_definition(
            &integration(vec![definition("key", SchemeType::ApiKey)]),
            &AccountCollection::new(),
            None,
            &mut collector,
        )
        .unwrap();

        assert_eq!(def.name, "key");
        assert!(collector.choice_prompts.is_empty());
    }

    #[test]
    fn multiple_definitions_prompt_with_labels() {
        let mut collector = ScriptedCollector::default().with_choice(1);
        let def = select_definition(
            &integration(vec![
                definition("basic", SchemeType::Basic),
                definition("oauth", SchemeType::OAuth2),
            ]),
            &AccountCollection::new(),
            None,
            &mut collector,
        )
        .unwrap();

        assert_eq!(def.name, "oauth");
        assert_eq!(
            collector.choice_prompts,
            vec![vec!["basic (basic)".to_string(), "oauth2 (oauth)".to_string()]]
        );
    }

    #[test]
    fn alias_uses_its_own_definition_without_prompting() {
        let mut collector = ScriptedCollector::default();
        let def = select_definition(
            &integration(vec![
                definition("basic", SchemeType::Basic),
                definition("oauth", SchemeType::OAuth2),
            ]),
            &accounts_with("work", "oauth"),
            Some("work"),
            &mut collector,
        )
        .unwrap();

        assert_eq!(def.name, "oauth");
        assert!(collector.choice_prompts.is_empty());
    }

    #[test]
    fn unknown_alias_fails() {
        let mut collector = ScriptedCollector::default();
        let err = select_definition(
            &integration(vec![definition("key", SchemeType::ApiKey)]),
            &accounts_with("work", "key"),
            Some("home"),
            &mut collector,
        )
        .unwrap_err();
        assert!(matches!(err, AuthError::AccountNotFound { ref alias, .. } if alias == "home"));
    }

    #[test]
    fn dangling_definition_reference_fails() {
        let mut collector = ScriptedCollector::default();
        let err = select_definition(
            &integration(vec![definition("key", SchemeType::ApiKey)]),
            &accounts_with("work", "removed"),
            Some("work"),
            &mut collector,
        )
        .unwrap_err();
        assert!(
            matches!(err, AuthError::SecurityDefinitionNotFound { ref definition, .. } if definition == "removed")
        );
    }
}
