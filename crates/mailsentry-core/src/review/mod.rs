//! Ingested message reviews and their analysis outcomes.

mod model;
mod repository;

pub use model::{AnalysisUpdate, NewReview, Priority, Review, ReviewId, Sentiment};
pub use repository::ReviewRepository;
