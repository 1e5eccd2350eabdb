//! Deal lifecycle operations: creation, lookup and negotiated updates.
//!
//! Every mutation runs load, engine, compare-and-swap save, then reporting.
//! Reporting happens after the write and cannot fail, so a committed change
//! is never rolled back by a notice or inbox entry.

use entity::{Deal, DealStatus, NotificationKind, UserRole};
use platform_store::StoreError;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{DealRoomError, DealRoomResult},
    negotiation::{
        ChangeKind, DealChange, INVALID_PRICE, NegotiationError, PriceChange, check_price_change,
        format_amount,
    },
    notify::NoticeKind,
    room::DealRoom,
};

/// Fields a buyer supplies when opening a deal.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealDraft {
    pub title: String,
    pub description: String,
    pub initial_price: Decimal,
    #[serde(default)]
    pub seller_id: Option<Uuid>,
}

impl DealRoom {
    pub fn create_deal(&self, draft: DealDraft, buyer_id: Uuid) -> DealRoomResult<Deal> {
        let deal = self
            .validate_draft(&draft, buyer_id)
            .map_err(|err| self.reject("create_deal", err))?;
        self.deals
            .insert_deal(deal.clone())
            .map_err(|err| self.reject("create_deal", err.into()))?;

        info!(deal_id = %deal.id, buyer_id = %buyer_id, "deal created");
        self.notifier
            .notify("Your deal has been successfully created", NoticeKind::Info);
        if let Some(seller_id) = deal.seller_id {
            let buyer = self.user(buyer_id).map(|u| u.name).unwrap_or_default();
            self.record_notification(
                seller_id,
                NotificationKind::NewDeal,
                format!("{buyer} initiated a new deal \"{}\"", deal.title),
                Some(deal.id),
            );
        }
        Ok(deal)
    }

    fn validate_draft(&self, draft: &DealDraft, buyer_id: Uuid) -> DealRoomResult<Deal> {
        let buyer = self.require_user(buyer_id)?;
        if buyer.role != UserRole::Buyer {
            return Err(DealRoomError::forbidden("Only buyers can create deals"));
        }
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(DealRoomError::validation("Title is required"));
        }
        let description = draft.description.trim();
        if description.is_empty() {
            return Err(DealRoomError::validation("Description is required"));
        }
        if draft.initial_price <= Decimal::ZERO {
            return Err(NegotiationError::InvalidPrice(INVALID_PRICE).into());
        }
        if let Some(seller_id) = draft.seller_id {
            if seller_id == buyer_id {
                return Err(DealRoomError::validation(
                    "Buyer and seller must be different users",
                ));
            }
            let seller = self.require_user(seller_id)?;
            if seller.role != UserRole::Seller {
                return Err(DealRoomError::validation("Selected counterparty is not a seller"));
            }
        }

        let now = self.now();
        Ok(Deal {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            initial_price: draft.initial_price,
            current_price: draft.initial_price,
            status: DealStatus::Pending,
            buyer_id,
            seller_id: draft.seller_id,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn deal_by_id(&self, id: Uuid) -> DealRoomResult<Option<Deal>> {
        Ok(self.deals.load_deal(id)?)
    }

    /// A deal as seen by one of its parties; `None` when it does not exist.
    pub fn visible_deal(&self, deal_id: Uuid, viewer_id: Uuid) -> DealRoomResult<Option<Deal>> {
        match self.party_deal(deal_id, viewer_id) {
            Ok(deal) => Ok(Some(deal)),
            Err(DealRoomError::DealNotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// All deals, newest first.
    pub fn deals(&self) -> DealRoomResult<Vec<Deal>> {
        let mut deals = self.deals.list_deals()?;
        deals.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(deals)
    }

    pub fn user_deals(&self, user_id: Uuid) -> DealRoomResult<Vec<Deal>> {
        let mut deals = self.deals()?;
        deals.retain(|deal| deal.is_party(user_id));
        Ok(deals)
    }

    pub fn update_deal_status(
        &self,
        deal_id: Uuid,
        status: DealStatus,
        requester: Uuid,
    ) -> DealRoomResult<Deal> {
        const OP: &str = "update_deal_status";
        let deal = self.require_deal(deal_id).map_err(|err| self.reject(OP, err))?;
        let change = self
            .negotiator
            .request_status_change(&deal, status, requester)
            .map_err(|err| self.reject(OP, err.into()))?;
        self.commit(OP, change, requester)
    }

    pub fn update_deal_price(
        &self,
        deal_id: Uuid,
        requester: Uuid,
        price: Decimal,
    ) -> DealRoomResult<Deal> {
        const OP: &str = "update_deal_price";
        let deal = self.require_deal(deal_id).map_err(|err| self.reject(OP, err))?;
        let change = self
            .negotiator
            .request_price_change(&deal, requester, price)
            .map_err(|err| self.reject(OP, err.into()))?;
        self.commit(OP, change, requester)
    }

    /// Run the price guards without saving. Returns the change summary a
    /// counter-offer form shows before submitting.
    pub fn preview_price_change(
        &self,
        deal_id: Uuid,
        requester: Uuid,
        price: Decimal,
    ) -> DealRoomResult<PriceChange> {
        let deal = self.require_deal(deal_id)?;
        Ok(check_price_change(&deal, requester, price)?)
    }

    fn commit(&self, op: &'static str, change: DealChange, requester: Uuid) -> DealRoomResult<Deal> {
        if let Err(err) = self.deals.save_deal(&change) {
            let notice = match (&err, change.kind()) {
                (StoreError::Conflict { .. }, ChangeKind::Status { .. }) => {
                    "There was a problem updating the deal status"
                }
                (StoreError::Conflict { .. }, ChangeKind::Price { .. }) => {
                    "There was a problem updating the deal price"
                }
                _ => "Something went wrong, please try again",
            };
            return Err(self.reject_with(op, notice, err.into()));
        }

        let deal = change.deal();
        let (notice, update) = match change.kind() {
            ChangeKind::Status { from, to } => {
                info!(deal_id = %deal.id, %requester, from = from.as_str(), to = to.as_str(), "deal status changed");
                (
                    format!("The deal status has been changed to {}", to.label()),
                    format!("Deal \"{}\" status changed to {}", deal.title, title_case(to.label())),
                )
            }
            ChangeKind::Price { from, to } => {
                info!(deal_id = %deal.id, %requester, %from, %to, "deal price changed");
                (
                    format!("The deal price has been updated to {}", format_amount(to)),
                    format!("Deal \"{}\" price updated to {}", deal.title, format_amount(to)),
                )
            }
        };
        self.notifier.notify(&notice, NoticeKind::Info);
        if let Some(counterparty) = deal.counterparty(requester) {
            self.record_notification(
                counterparty,
                NotificationKind::DealUpdate,
                update,
                Some(deal.id),
            );
        }
        Ok(change.into_deal())
    }
}

fn title_case(label: &str) -> String {
    label
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        clock::{Clock, ManualClock},
        notify::{Notice, NoticeBuffer},
    };
    use chrono::{Duration, TimeZone, Utc};
    use entity::User;
    use rust_decimal_macros::dec;

    struct Harness {
        room: DealRoom,
        notices: Arc<NoticeBuffer>,
        clock: Arc<ManualClock>,
        buyer: User,
        seller: User,
    }

    fn user(name: &str, role: UserRole) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.into(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            role,
            avatar: None,
        }
    }

    fn harness() -> Harness {
        let notices = Arc::new(NoticeBuffer::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2023, 6, 15, 9, 0, 0).unwrap(),
        ));
        let room = DealRoom::in_memory()
            .with_notifier(notices.clone())
            .with_clock(clock.clone());
        let buyer = user("John Buyer", UserRole::Buyer);
        let seller = user("Sarah Seller", UserRole::Seller);
        room.users.register(buyer.clone()).unwrap();
        room.users.register(seller.clone()).unwrap();
        Harness {
            room,
            notices,
            clock,
            buyer,
            seller,
        }
    }

    impl Harness {
        fn draft(&self) -> DealDraft {
            DealDraft {
                title: "  Office Equipment Acquisition ".into(),
                description: "Purchase of 20 high-end workstations".into(),
                initial_price: dec!(50000),
                seller_id: Some(self.seller.id),
            }
        }

        fn open_deal(&self) -> Deal {
            let deal = self.room.create_deal(self.draft(), self.buyer.id).unwrap();
            self.clock.advance(Duration::minutes(1));
            self.room
                .update_deal_status(deal.id, DealStatus::InProgress, self.seller.id)
                .unwrap()
        }
    }

    #[test]
    fn create_deal_starts_pending_and_tells_the_seller() {
        let h = harness();
        let deal = h.room.create_deal(h.draft(), h.buyer.id).unwrap();

        assert_eq!(deal.title, "Office Equipment Acquisition");
        assert_eq!(deal.status, DealStatus::Pending);
        assert_eq!(deal.current_price, deal.initial_price);
        assert_eq!(deal.created_at, deal.updated_at);
        assert_eq!(
            h.notices.last(),
            Some(Notice {
                message: "Your deal has been successfully created".into(),
                kind: NoticeKind::Info,
            })
        );

        let inbox = h.room.notifications_for(h.seller.id);
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].kind, NotificationKind::NewDeal);
        assert_eq!(
            inbox[0].content,
            "John Buyer initiated a new deal \"Office Equipment Acquisition\""
        );
    }

    #[test]
    fn only_buyers_may_create_deals() {
        let h = harness();
        let err = h.room.create_deal(h.draft(), h.seller.id).unwrap_err();
        assert_eq!(err, DealRoomError::forbidden("Only buyers can create deals"));
        assert_eq!(h.notices.last().unwrap().kind, NoticeKind::Error);
        assert!(h.room.deals().unwrap().is_empty());
    }

    #[test]
    fn create_deal_validates_fields_and_counterparty() {
        let h = harness();
        let blank = DealDraft {
            title: "   ".into(),
            ..h.draft()
        };
        assert!(matches!(
            h.room.create_deal(blank, h.buyer.id),
            Err(DealRoomError::Validation(_))
        ));

        let free = DealDraft {
            initial_price: dec!(0),
            ..h.draft()
        };
        assert!(matches!(
            h.room.create_deal(free, h.buyer.id),
            Err(DealRoomError::Negotiation(NegotiationError::InvalidPrice(_)))
        ));

        let other_buyer = user("David Buyer", UserRole::Buyer);
        h.room.users.register(other_buyer.clone()).unwrap();
        let wrong_side = DealDraft {
            seller_id: Some(other_buyer.id),
            ..h.draft()
        };
        assert!(matches!(
            h.room.create_deal(wrong_side, h.buyer.id),
            Err(DealRoomError::Validation(_))
        ));

        let ghost = Uuid::new_v4();
        let missing = DealDraft {
            seller_id: Some(ghost),
            ..h.draft()
        };
        assert_eq!(
            h.room.create_deal(missing, h.buyer.id).unwrap_err(),
            DealRoomError::UnknownUser(ghost)
        );
    }

    #[test]
    fn status_update_persists_and_reports() {
        let h = harness();
        let deal = h.room.create_deal(h.draft(), h.buyer.id).unwrap();
        h.clock.advance(Duration::hours(1));

        let updated = h
            .room
            .update_deal_status(deal.id, DealStatus::InProgress, h.seller.id)
            .unwrap();
        assert_eq!(updated.status, DealStatus::InProgress);
        assert_eq!(updated.updated_at, h.clock.now());
        assert_eq!(h.room.deal_by_id(deal.id).unwrap(), Some(updated));
        assert_eq!(
            h.notices.last().unwrap().message,
            "The deal status has been changed to in progress"
        );

        let inbox = h.room.notifications_for(h.buyer.id);
        assert_eq!(
            inbox[0].content,
            "Deal \"Office Equipment Acquisition\" status changed to In Progress"
        );
    }

    #[test]
    fn price_update_formats_amount() {
        let h = harness();
        let deal = h.open_deal();
        let updated = h
            .room
            .update_deal_price(deal.id, h.buyer.id, dec!(45000))
            .unwrap();
        assert_eq!(updated.current_price, dec!(45000));
        assert_eq!(updated.initial_price, dec!(50000));
        assert_eq!(
            h.notices.last().unwrap().message,
            "The deal price has been updated to $45,000"
        );
    }

    #[test]
    fn rejected_price_leaves_deal_untouched() {
        let h = harness();
        let deal = h.open_deal();
        let err = h
            .room
            .update_deal_price(deal.id, h.buyer.id, dec!(60000))
            .unwrap_err();
        assert_eq!(
            err,
            DealRoomError::Negotiation(NegotiationError::InvalidDirection {
                role: UserRole::Buyer
            })
        );
        assert_eq!(
            h.notices.last(),
            Some(Notice {
                message: "As a buyer, you can only offer a lower price".into(),
                kind: NoticeKind::Error,
            })
        );
        assert_eq!(h.room.deal_by_id(deal.id).unwrap(), Some(deal));
    }

    #[test]
    fn unknown_deal_is_not_found() {
        let h = harness();
        let id = Uuid::new_v4();
        assert_eq!(
            h.room
                .update_deal_status(id, DealStatus::Cancelled, h.buyer.id)
                .unwrap_err(),
            DealRoomError::DealNotFound(id)
        );
    }

    #[test]
    fn preview_does_not_save() {
        let h = harness();
        let deal = h.open_deal();
        let preview = h
            .room
            .preview_price_change(deal.id, h.buyer.id, dec!(45000))
            .unwrap();
        assert_eq!(preview.to_string(), "Decrease by 10.00%");
        assert_eq!(h.room.deal_by_id(deal.id).unwrap(), Some(deal));
    }

    #[test]
    fn user_deals_only_lists_parties() {
        let h = harness();
        let deal = h.room.create_deal(h.draft(), h.buyer.id).unwrap();
        assert_eq!(h.room.user_deals(h.seller.id).unwrap(), vec![deal]);
        assert!(h.room.user_deals(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn visible_deal_hides_deals_from_outsiders() {
        let h = harness();
        let deal = h.room.create_deal(h.draft(), h.buyer.id).unwrap();
        assert_eq!(
            h.room.visible_deal(deal.id, h.seller.id).unwrap(),
            Some(deal.clone())
        );
        assert!(matches!(
            h.room.visible_deal(deal.id, Uuid::new_v4()),
            Err(DealRoomError::Forbidden(_))
        ));
        assert_eq!(h.room.visible_deal(Uuid::new_v4(), h.buyer.id).unwrap(), None);
    }

    #[test]
    fn status_words_are_title_cased() {
        assert_eq!(title_case("in progress"), "In Progress");
        assert_eq!(title_case("completed"), "Completed");
    }
}
