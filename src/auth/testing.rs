use std::collections::VecDeque;
use std::sync::mpsc;
use std::thread;

use tiny_http::{Header, Response, Server, StatusCode};

use super::questions::{AnswerCollector, Answers, Question};
use crate::error::{AuthError, Result};

/// Collector that replays canned answers and records every prompt.
#[derive(Default)]
pub struct ScriptedCollector {
    answers: VecDeque<Answers>,
    choices: VecDeque<usize>,
    pub asked: Vec<Vec<Question>>,
    pub choice_prompts: Vec<Vec<String>>,
}

impl ScriptedCollector {
    /// Queue the answers for the next `ask` call. Questions without an
    /// entry get their default, or an empty string.
    pub fn with_answers(mut self, pairs: &[(&str, &str)]) -> Self {
        self.answers.push_back(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn with_choice(mut self, index: usize) -> Self {
        self.choices.push_back(index);
        self
    }

    pub fn prompted(&self) -> bool {
        !self.asked.is_empty() || !self.choice_prompts.is_empty()
    }
}

impl AnswerCollector for ScriptedCollector {
    fn ask(&mut self, questions: &[Question]) -> Result<Answers> {
        self.asked.push(questions.to_vec());
        let mut scripted = self.answers.pop_front().unwrap_or_default();

        Ok(questions
            .iter()
            .map(|q| {
                let value = scripted
                    .remove(q.key)
                    .or_else(|| q.default.clone())
                    .unwrap_or_default();
                (q.key.to_string(), value)
            })
            .collect())
    }

    fn ask_choice(&mut self, _prompt: &str, options: &[String]) -> Result<usize> {
        self.choice_prompts.push(options.to_vec());
        self.choices.pop_front().ok_or_else(|| AuthError::Prompt {
            what: "selection".to_string(),
            reason: "no scripted choice".to_string(),
        })
    }
}

/// One-shot token endpoint answering with `status` and `body`. Returns its
/// URL and a receiver yielding the form body it was sent.
pub fn stub_token_endpoint(status: u16, body: &'static str) -> (String, mpsc::Receiver<String>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let port = server.server_addr().to_ip().unwrap().port();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        let mut request = server.recv().unwrap();
        let mut form = String::new();
        request.as_reader().read_to_string(&mut form).unwrap();
        tx.send(form).unwrap();

        let response = Response::from_string(body)
            .with_status_code(StatusCode(status))
            .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
        request.respond(response).unwrap();
    });

    (format!("http://127.0.0.1:{}/token", port), rx)
}
