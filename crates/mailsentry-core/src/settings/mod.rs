//! Per-subscriber notification settings and responder profile.

mod model;
mod repository;

pub use model::{NotificationSettings, ResponderProfile};
pub use repository::SettingsRepository;
