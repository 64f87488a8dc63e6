//! Response-draft generation and storage.

mod generator;
mod model;
mod repository;
mod templates;

pub use generator::DraftGenerator;
pub use model::{DraftId, DraftResponse, NewDraft, ResponseTone};
pub use repository::DraftRepository;
pub use templates::IssueKind;
