use std::collections::BTreeMap;

use crate::error::Result;
use crate::integration::SchemeType;
use crate::storage::Account;

pub type Answers = BTreeMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub key: &'static str,
    pub prompt: &'static str,
    pub secret: bool,
    pub default: Option<String>,
}

impl Question {
    const fn new(key: &'static str, prompt: &'static str) -> Self {
        Self {
            key,
            prompt,
            secret: false,
            default: None,
        }
    }

    const fn secret(key: &'static str, prompt: &'static str) -> Self {
        Self {
            key,
            prompt,
            secret: true,
            default: None,
        }
    }
}

/// Collects answers from whoever is running the command.
pub trait AnswerCollector {
    /// Ask every question in order. Unanswered questions map to an empty
    /// string (or their default).
    fn ask(&mut self, questions: &[Question]) -> Result<Answers>;

    /// Pick one of `options`, returning its index.
    fn ask_choice(&mut self, prompt: &str, options: &[String]) -> Result<usize>;
}

pub const ALIAS_KEY: &str = "alias";

pub fn alias_question() -> Question {
    Question::new(ALIAS_KEY, "Choose an alias for this account:")
}

/// Fields requested for each scheme, in prompt order.
pub fn questions_for(scheme: SchemeType) -> Vec<Question> {
    match scheme {
        SchemeType::Basic => vec![
            Question::new("username", "username:"),
            Question::secret("password", "password:"),
        ],
        SchemeType::ApiKey => vec![Question::new("api_key", "api_key:")],
        SchemeType::OAuth2 => vec![
            Question::new("access_token", "access_token:"),
            Question::new("refresh_token", "refresh_token (optional):"),
            Question::new("client_id", "client_id (optional):"),
            Question::new("client_secret", "client_secret (optional):"),
        ],
    }
}

/// Pre-fill each question with the account's current value.
pub fn with_defaults(mut questions: Vec<Question>, account: &Account) -> Vec<Question> {
    for question in &mut questions {
        question.default = account.field(question.key).map(str::to_string);
    }
    questions
}
