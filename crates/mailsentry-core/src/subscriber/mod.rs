//! Subscriber management.

mod model;
mod repository;

pub use model::{Plan, Subscriber, SubscriberId};
pub use repository::SubscriberRepository;
