//! Notification fan-out.
//!
//! One channel-agnostic payload, one trait per delivery mechanism, and a
//! dispatcher that applies priority gates and plan entitlement before
//! attempting every selected channel independently.

mod channel;
mod dispatch;
mod email;
mod linking;
mod message;
mod sms;
mod telegram;

pub use channel::{ChannelKind, NotificationChannel, Recipient};
pub use dispatch::{Dispatcher, entitled_channels};
pub use email::EmailChannel;
pub use linking::TelegramLinker;
pub use message::{ChannelResult, DeliverySummary, Notification};
pub use sms::SmsChannel;
pub use telegram::TelegramChannel;
