//! Connected mailbox accounts.

mod model;
mod repository;

pub use model::{Account, AccountId, NewAccount};
pub use repository::AccountRepository;
