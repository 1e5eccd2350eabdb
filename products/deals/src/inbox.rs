//! Per-user notification inbox.

use entity::{Notification, NotificationKind};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::{DealRoomError, DealRoomResult},
    room::DealRoom,
};

impl DealRoom {
    pub fn notifications_for(&self, user_id: Uuid) -> Vec<Notification> {
        let mut items = self.notifications.filter(|n| n.user_id == user_id);
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }

    pub fn unread_count(&self, user_id: Uuid) -> usize {
        self.notifications
            .count(|n| n.user_id == user_id && !n.read)
    }

    /// Mark one of the user's notifications as read. Another user's
    /// notification is reported as missing.
    pub fn mark_as_read(&self, user_id: Uuid, notification_id: Uuid) -> DealRoomResult<Notification> {
        match self.notifications.get(&notification_id) {
            Some(existing) if existing.user_id == user_id => {}
            _ => return Err(DealRoomError::NotificationNotFound(notification_id)),
        }
        Ok(self.notifications.update(&notification_id, |n| n.read = true)?)
    }

    pub fn mark_all_as_read(&self, user_id: Uuid) -> usize {
        self.notifications.update_where(
            |n| n.user_id == user_id,
            |n| !std::mem::replace(&mut n.read, true),
        )
    }

    pub(crate) fn record_notification(
        &self,
        user_id: Uuid,
        kind: NotificationKind,
        content: String,
        deal_id: Option<Uuid>,
    ) {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id,
            kind,
            content,
            deal_id,
            read: false,
            created_at: self.now(),
        };
        debug!(%user_id, kind = kind.as_str(), "notification recorded");
        // Fresh v4 ids do not collide.
        let _ = self.notifications.insert(notification.id, notification);
    }
}
