//! Shared setup for cross-crate deal room tests.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use entity::{Deal, User};
use platform_store::MemoryTable;
use products_deals::{DealRoom, ManualClock, NoticeBuffer, SeededDealRoom, seed_demo};

pub struct DemoRoom {
    pub room: DealRoom,
    pub seeded: SeededDealRoom,
    pub deals: Arc<MemoryTable<Deal>>,
    pub notices: Arc<NoticeBuffer>,
    pub clock: Arc<ManualClock>,
}

impl DemoRoom {
    pub fn user(&self, email: &str) -> User {
        self.seeded
            .user_email(email)
            .cloned()
            .unwrap_or_else(|| panic!("no demo user {email}"))
    }

    pub fn deal(&self, title: &str) -> Deal {
        self.seeded
            .deal_titled(title)
            .cloned()
            .unwrap_or_else(|| panic!("no demo deal {title}"))
    }

    /// Current stored copy of a deal.
    pub fn stored(&self, deal: &Deal) -> Deal {
        self.deals
            .get(&deal.id)
            .unwrap_or_else(|| panic!("deal {} vanished", deal.id))
    }
}

/// A seeded room with a frozen clock and a notice buffer. The deal table
/// handle is shared with the room so tests can inspect or race it.
pub fn demo_room() -> DemoRoom {
    let deals = Arc::new(MemoryTable::<Deal>::new("deal"));
    let users = Arc::new(MemoryTable::<User>::new("user"));
    let notices = Arc::new(NoticeBuffer::new());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2023, 6, 20, 12, 0, 0).unwrap(),
    ));
    let room = DealRoom::new(deals.clone(), users)
        .with_notifier(notices.clone())
        .with_clock(clock.clone());
    let seeded = seed_demo(&room).expect("demo data seeds into an empty room");
    DemoRoom {
        room,
        seeded,
        deals,
        notices,
        clock,
    }
}
