//! Plain records shared by every deal room crate.

pub mod deals;
pub mod documents;
pub mod messages;
pub mod notifications;
pub mod users;

pub use deals::{Deal, DealStatus};
pub use documents::Document;
pub use messages::Message;
pub use notifications::{Notification, NotificationKind};
pub use users::{User, UserRole};
