use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A negotiated transaction between a buyer and an optional seller.
///
/// Records are snapshots: `status`, `current_price` and `updated_at` only
/// change through the negotiation engine in `products-deals`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub initial_price: Decimal,
    pub current_price: Decimal,
    pub status: DealStatus,
    pub buyer_id: Uuid,
    pub seller_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Deal {
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.buyer_id == user_id || self.seller_id == Some(user_id)
    }

    /// The other party of the deal, if `user_id` is a party and the other side is attached.
    pub fn counterparty(&self, user_id: Uuid) -> Option<Uuid> {
        if self.buyer_id == user_id {
            self.seller_id
        } else if self.seller_id == Some(user_id) {
            Some(self.buyer_id)
        } else {
            None
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl DealStatus {
    pub const ALL: [DealStatus; 4] = [
        DealStatus::Pending,
        DealStatus::InProgress,
        DealStatus::Completed,
        DealStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::InProgress => "in_progress",
            DealStatus::Completed => "completed",
            DealStatus::Cancelled => "cancelled",
        }
    }

    /// Human wording used in notices, e.g. `in progress`.
    pub fn label(self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::InProgress => "in progress",
            DealStatus::Completed => "completed",
            DealStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DealStatus::Completed | DealStatus::Cancelled)
    }

    /// Status graph: any non-terminal status may move to any other status.
    pub fn can_transition_to(self, next: DealStatus) -> bool {
        !self.is_terminal() && self != next
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
