pub mod callback;
pub mod flow;
pub mod oauth;
pub mod questions;
pub mod selector;
#[cfg(test)]
pub mod testing;

pub use callback::CallbackOutcome;
pub use flow::{collect_credentials, generate_token, FlowContext};
pub use questions::{AnswerCollector, Answers, Question};
pub use selector::select_definition;
