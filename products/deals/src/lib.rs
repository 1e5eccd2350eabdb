//! Deal room: price negotiation between a buyer and a seller, plus the chat,
//! documents and inbox that surround it.
//!
//! [`negotiation`] holds the pure state machine. [`DealRoom`] wires it to the
//! storage and notification seams and exposes the operations the API layer
//! calls.

pub mod accounts;
pub mod analytics;
pub mod clock;
pub mod collaboration;
pub mod error;
pub mod fixtures;
pub mod inbox;
pub mod negotiation;
pub mod notify;
pub mod repository;
pub mod room;
pub mod service;

pub use accounts::Registration;
pub use analytics::{AnalyticsSummary, MonthlyCount};
pub use clock::{Clock, ManualClock, SystemClock};
pub use collaboration::DocumentUpload;
pub use error::{DealRoomError, DealRoomResult};
pub use fixtures::{SeedSummary, SeededDealRoom, seed_demo};
pub use negotiation::{
    ChangeKind, DealChange, NegotiationError, Negotiator, PriceChange, PriceDirection,
    format_amount, parse_price,
};
pub use notify::{Notice, NoticeBuffer, NoticeKind, Notifier, TracingNotifier};
pub use repository::{DealRepository, UserDirectory};
pub use room::DealRoom;
pub use service::DealDraft;
