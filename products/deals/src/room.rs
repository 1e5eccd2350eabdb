use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use entity::{Deal, Document, Message, Notification, User};
use platform_store::MemoryTable;
use tracing::warn;
use uuid::Uuid;

use crate::{
    clock::{Clock, SystemClock},
    error::{DealRoomError, DealRoomResult},
    negotiation::Negotiator,
    notify::{NoticeKind, Notifier, TracingNotifier},
    repository::{DealRepository, UserDirectory},
};

/// Everything a deal room needs, wired once and shared by handle.
///
/// Cloning is cheap: every field is reference counted.
#[derive(Clone)]
pub struct DealRoom {
    pub(crate) deals: Arc<dyn DealRepository>,
    pub(crate) users: Arc<dyn UserDirectory>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) negotiator: Negotiator,
    pub(crate) messages: MemoryTable<Message>,
    pub(crate) documents: MemoryTable<Document>,
    pub(crate) notifications: MemoryTable<Notification>,
}

impl fmt::Debug for DealRoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DealRoom")
            .field("messages", &self.messages.len())
            .field("documents", &self.documents.len())
            .field("notifications", &self.notifications.len())
            .finish_non_exhaustive()
    }
}

impl DealRoom {
    pub fn new(deals: Arc<dyn DealRepository>, users: Arc<dyn UserDirectory>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self {
            deals,
            users,
            notifier: Arc::new(TracingNotifier),
            negotiator: Negotiator::new(clock.clone()),
            clock,
            messages: MemoryTable::new("message"),
            documents: MemoryTable::new("document"),
            notifications: MemoryTable::new("notification"),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryTable::<Deal>::new("deal")),
            Arc::new(MemoryTable::<User>::new("user")),
        )
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.negotiator = Negotiator::new(clock.clone());
        self.clock = clock;
        self
    }

    pub fn negotiator(&self) -> &Negotiator {
        &self.negotiator
    }

    pub fn user(&self, id: Uuid) -> Option<User> {
        self.users.find_user(id)
    }

    pub fn users(&self) -> Vec<User> {
        self.users.list_users()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn require_user(&self, id: Uuid) -> DealRoomResult<User> {
        self.users.find_user(id).ok_or(DealRoomError::UnknownUser(id))
    }

    pub(crate) fn require_deal(&self, id: Uuid) -> DealRoomResult<Deal> {
        self.deals.load_deal(id)?.ok_or(DealRoomError::DealNotFound(id))
    }

    /// Load a deal the user takes part in.
    pub(crate) fn party_deal(&self, deal_id: Uuid, user_id: Uuid) -> DealRoomResult<Deal> {
        let deal = self.require_deal(deal_id)?;
        if !deal.is_party(user_id) {
            return Err(DealRoomError::forbidden(
                "Only the buyer or seller can access this deal",
            ));
        }
        Ok(deal)
    }

    /// Report a rejection to the notifier and hand the error back.
    pub(crate) fn reject(&self, operation: &'static str, err: DealRoomError) -> DealRoomError {
        self.reject_with(operation, &err.to_string(), err)
    }

    pub(crate) fn reject_with(
        &self,
        operation: &'static str,
        notice: &str,
        err: DealRoomError,
    ) -> DealRoomError {
        warn!(operation, error = %err, "deal room request rejected");
        self.notifier.notify(notice, NoticeKind::Error);
        err
    }
}
