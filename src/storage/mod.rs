mod store;
mod types;

pub use store::{display_path, CredentialStore};
pub use types::{Account, AccountCollection};
