use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password, Select};

use crate::auth::{AnswerCollector, Answers, Question};
use crate::error::{AuthError, Result};

/// Interactive prompts on the controlling terminal.
#[derive(Default)]
pub struct TerminalCollector {
    theme: ColorfulTheme,
}

impl TerminalCollector {
    pub fn new() -> Self {
        Self::default()
    }

    fn ask_one(&self, question: &Question) -> Result<String> {
        let prompt = question.prompt.trim_end_matches(':');

        if question.secret {
            let value = Password::with_theme(&self.theme)
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()
                .map_err(|e| prompt_error(question.key, e))?;
            // Hidden input cannot show a default, so an empty answer keeps it.
            if value.is_empty() {
                return Ok(question.default.clone().unwrap_or_default());
            }
            return Ok(value);
        }

        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if let Some(default) = &question.default {
            input = input.default(default.clone());
        }
        input
            .interact_text()
            .map(|value| value.trim().to_string())
            .map_err(|e| prompt_error(question.key, e))
    }
}

impl AnswerCollector for TerminalCollector {
    fn ask(&mut self, questions: &[Question]) -> Result<Answers> {
        let mut answers = Answers::new();
        for question in questions {
            let value = self.ask_one(question)?;
            answers.insert(question.key.to_string(), value);
        }
        Ok(answers)
    }

    fn ask_choice(&mut self, prompt: &str, options: &[String]) -> Result<usize> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(options)
            .default(0)
            .interact()
            .map_err(|e| prompt_error("selection", e))
    }
}

fn prompt_error(what: &str, err: dialoguer::Error) -> AuthError {
    AuthError::Prompt {
        what: what.to_string(),
        reason: err.to_string(),
    }
}
