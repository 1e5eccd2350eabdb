use chrono::Datelike;
use entity::{DealStatus, UserRole};
use serde::Serialize;

use crate::{error::DealRoomResult, room::DealRoom};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCount {
    pub month: &'static str,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsSummary {
    pub total_deals: usize,
    pub pending_deals: usize,
    pub in_progress_deals: usize,
    pub completed_deals: usize,
    pub cancelled_deals: usize,
    pub total_users: usize,
    pub buyers_count: usize,
    pub sellers_count: usize,
    pub messages_sent: usize,
    pub documents_uploaded: usize,
    pub monthly_deals: Vec<MonthlyCount>,
}

impl DealRoom {
    /// Platform-wide counters; `monthly_deals` buckets deals created in `year`.
    pub fn summary(&self, year: i32) -> DealRoomResult<AnalyticsSummary> {
        let deals = self.deals.list_deals()?;
        let users = self.users.list_users();
        let by_status = |status: DealStatus| deals.iter().filter(|d| d.status == status).count();

        let mut monthly = [0usize; 12];
        for deal in deals.iter().filter(|d| d.created_at.year() == year) {
            monthly[deal.created_at.month0() as usize] += 1;
        }

        Ok(AnalyticsSummary {
            total_deals: deals.len(),
            pending_deals: by_status(DealStatus::Pending),
            in_progress_deals: by_status(DealStatus::InProgress),
            completed_deals: by_status(DealStatus::Completed),
            cancelled_deals: by_status(DealStatus::Cancelled),
            total_users: users.len(),
            buyers_count: users.iter().filter(|u| u.role == UserRole::Buyer).count(),
            sellers_count: users.iter().filter(|u| u.role == UserRole::Seller).count(),
            messages_sent: self.messages.len(),
            documents_uploaded: self.documents.len(),
            monthly_deals: MONTHS
                .into_iter()
                .zip(monthly)
                .map(|(month, count)| MonthlyCount { month, count })
                .collect(),
        })
    }
}
