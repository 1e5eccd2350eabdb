//! Demo data for local runs and tests.

use chrono::{DateTime, TimeZone, Utc};
use entity::{
    Deal, DealStatus, Document, Message, Notification, NotificationKind, User, UserRole,
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{DealRoomError, DealRoomResult},
    room::DealRoom,
};

const MB: u64 = 1024 * 1024;

/// Handles to what [`seed_demo`] inserted.
#[derive(Clone, Debug)]
pub struct SeededDealRoom {
    pub users: Vec<User>,
    pub deals: Vec<Deal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub deals: usize,
    pub messages: usize,
    pub documents: usize,
    pub notifications: usize,
}

impl SeededDealRoom {
    pub fn user_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email.eq_ignore_ascii_case(email))
    }

    pub fn deal_titled(&self, title: &str) -> Option<&Deal> {
        self.deals.iter().find(|d| d.title == title)
    }
}

fn at(year: i32, month: u32, day: u32, hour: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, min, 0)
        .single()
        .unwrap_or_default()
}

fn person(name: &str, email: &str, role: UserRole, avatar: &str) -> User {
    User {
        id: Uuid::new_v4(),
        name: name.into(),
        email: email.into(),
        role,
        avatar: Some(format!("https://randomuser.me/api/portraits/{avatar}.jpg")),
    }
}

#[allow(clippy::too_many_arguments)]
fn deal(
    title: &str,
    description: &str,
    initial: i64,
    current: i64,
    status: DealStatus,
    buyer: &User,
    seller: &User,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
) -> Deal {
    Deal {
        id: Uuid::new_v4(),
        title: title.into(),
        description: description.into(),
        initial_price: Decimal::from(initial),
        current_price: Decimal::from(current),
        status,
        buyer_id: buyer.id,
        seller_id: Some(seller.id),
        created_at,
        updated_at,
    }
}

/// Load the demo users, deals, chat, documents and notifications.
///
/// Every record is built before anything is written, and the room is left
/// untouched when any demo email is already registered.
pub fn seed_demo(room: &DealRoom) -> DealRoomResult<SeededDealRoom> {
    let john = person("John Buyer", "john@example.com", UserRole::Buyer, "men/1");
    let sarah = person("Sarah Seller", "sarah@example.com", UserRole::Seller, "women/2");
    let david = person("David Buyer", "david@example.com", UserRole::Buyer, "men/3");
    let emma = person("Emma Seller", "emma@example.com", UserRole::Seller, "women/4");
    let users = vec![john.clone(), sarah.clone(), david.clone(), emma.clone()];
    if let Some(taken) = users
        .iter()
        .find(|user| room.users.find_by_email(&user.email).is_some())
    {
        return Err(DealRoomError::validation(format!(
            "Demo data has already been seeded ({} is registered)",
            taken.email
        )));
    }

    let office = deal(
        "Office Equipment Acquisition",
        "Purchase of 20 high-end workstations for the new office space",
        50_000,
        47_500,
        DealStatus::InProgress,
        &john,
        &sarah,
        at(2023, 6, 15, 0, 0),
        at(2023, 6, 16, 0, 0),
    );
    let licensing = deal(
        "Software Licensing Agreement",
        "Enterprise license for design software for 50 users",
        25_000,
        25_000,
        DealStatus::Pending,
        &david,
        &emma,
        at(2023, 7, 5, 0, 0),
        at(2023, 7, 5, 0, 0),
    );
    let marketing = deal(
        "Marketing Campaign Partnership",
        "Joint marketing campaign for product launch",
        35_000,
        32_000,
        DealStatus::Completed,
        &john,
        &emma,
        at(2023, 5, 10, 0, 0),
        at(2023, 5, 25, 0, 0),
    );
    let consulting = deal(
        "Consulting Services Contract",
        "IT infrastructure assessment and recommendations",
        18_000,
        18_000,
        DealStatus::Cancelled,
        &david,
        &sarah,
        at(2023, 4, 1, 0, 0),
        at(2023, 4, 15, 0, 0),
    );
    let deals = vec![office.clone(), licensing.clone(), marketing, consulting];

    let chat = [
        (&office, &john, "Hello, I am interested in making a deal.", at(2023, 6, 15, 10, 30), true),
        (&office, &sarah, "Great! Let me know your offer.", at(2023, 6, 15, 10, 35), true),
        (&office, &john, "I think $45,000 is a fair price considering the market.", at(2023, 6, 15, 10, 40), true),
        (&office, &sarah, "I was thinking more along the lines of $50,000.", at(2023, 6, 15, 10, 45), false),
        (&licensing, &david, "Hi, I would like to discuss the software licensing deal.", at(2023, 7, 5, 9, 0), true),
        (&licensing, &emma, "Hello! Yes, I can offer you a good price for bulk licenses.", at(2023, 7, 5, 9, 15), true),
    ];
    let messages: Vec<Message> = chat
        .into_iter()
        .map(|(deal, sender, content, timestamp, read)| Message {
            id: Uuid::new_v4(),
            deal_id: deal.id,
            sender_id: sender.id,
            content: content.into(),
            timestamp,
            read,
        })
        .collect();

    let documents = [
        (&office, &john, "Contract Agreement.pdf", "application/pdf", MB * 23 / 10, at(2023, 6, 15, 0, 0)),
        (
            &office,
            &sarah,
            "Financial Report.xlsx",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            MB * 15 / 10,
            at(2023, 6, 16, 0, 0),
        ),
        (
            &licensing,
            &david,
            "Product Specifications.docx",
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
            MB * 8 / 10,
            at(2023, 7, 5, 0, 0),
        ),
    ];
    let documents: Vec<Document> = documents
        .into_iter()
        .map(|(deal, uploader, name, content_type, size, created_at)| Document {
            id: Uuid::new_v4(),
            deal_id: deal.id,
            name: name.into(),
            content_type: content_type.into(),
            size,
            uploaded_by: uploader.id,
            created_at,
            access_control: std::iter::once(deal.buyer_id).chain(deal.seller_id).collect(),
        })
        .collect();

    let notifications = [
        (
            &john,
            NotificationKind::NewMessage,
            "Sarah Seller sent you a message".to_string(),
            &office,
            false,
            at(2023, 6, 15, 10, 45),
        ),
        (
            &sarah,
            NotificationKind::DealUpdate,
            format!("Deal \"{}\" status changed to In Progress", office.title),
            &office,
            true,
            at(2023, 6, 16, 0, 0),
        ),
        (
            &david,
            NotificationKind::DocumentUpload,
            "Emma Seller uploaded a new document".to_string(),
            &licensing,
            false,
            at(2023, 7, 5, 0, 0),
        ),
        (
            &emma,
            NotificationKind::NewDeal,
            format!("David Buyer initiated a new deal \"{}\"", licensing.title),
            &licensing,
            true,
            at(2023, 7, 5, 0, 0),
        ),
    ];
    let notifications: Vec<Notification> = notifications
        .into_iter()
        .map(|(user, kind, content, deal, read, created_at)| Notification {
            id: Uuid::new_v4(),
            user_id: user.id,
            kind,
            content,
            deal_id: Some(deal.id),
            read,
            created_at,
        })
        .collect();

    for user in &users {
        room.users.register(user.clone())?;
    }
    for deal in &deals {
        room.deals.insert_deal(deal.clone())?;
    }
    for message in messages {
        room.messages.insert(message.id, message)?;
    }
    for document in documents {
        room.documents.insert(document.id, document)?;
    }
    for notification in notifications {
        room.notifications.insert(notification.id, notification)?;
    }

    info!(users = users.len(), deals = deals.len(), "demo data seeded");
    Ok(SeededDealRoom { users, deals })
}

impl DealRoom {
    pub fn seed_summary(&self) -> SeedSummary {
        SeedSummary {
            users: self.users.list_users().len(),
            deals: self.deals.list_deals().map(|d| d.len()).unwrap_or_default(),
            messages: self.messages.len(),
            documents: self.documents.len(),
            notifications: self.notifications.len(),
        }
    }
}
