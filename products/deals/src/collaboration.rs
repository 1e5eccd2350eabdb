//! Chat messages and shared document metadata inside a deal.

use chrono::Duration;
use entity::{Document, Message, NotificationKind};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{DealRoomError, DealRoomResult},
    notify::NoticeKind,
    room::DealRoom,
};

/// Metadata for a document being attached to a deal.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentUpload {
    pub name: String,
    pub content_type: String,
    pub size: u64,
    #[serde(default)]
    pub share_with_counterparty: bool,
}

impl DealRoom {
    pub fn send_message(
        &self,
        deal_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> DealRoomResult<Message> {
        let deal = self
            .party_deal(deal_id, sender_id)
            .map_err(|err| self.reject("send_message", err))?;
        let content = content.trim();
        if content.is_empty() {
            return Err(self.reject(
                "send_message",
                DealRoomError::validation("Message cannot be empty"),
            ));
        }

        // Timestamps are unique and increasing per deal, even with a frozen clock.
        let now = self.now();
        let id = Uuid::new_v4();
        let message = self.messages.insert_with(id, |existing| {
            let last = existing
                .filter(|m| m.deal_id == deal_id)
                .map(|m| m.timestamp)
                .max();
            let timestamp = match last {
                Some(last) if now <= last => last + Duration::microseconds(1),
                _ => now,
            };
            Message {
                id,
                deal_id,
                sender_id,
                content: content.to_string(),
                timestamp,
                read: false,
            }
        })?;
        info!(%deal_id, %sender_id, "message sent");

        if let Some(recipient) = deal.counterparty(sender_id) {
            let sender = self.user(sender_id).map(|u| u.name).unwrap_or_default();
            self.record_notification(
                recipient,
                NotificationKind::NewMessage,
                format!("{sender} sent you a message"),
                Some(deal_id),
            );
        }
        Ok(message)
    }

    /// Messages of a deal in send order. Parties only.
    pub fn deal_messages(&self, deal_id: Uuid, viewer_id: Uuid) -> DealRoomResult<Vec<Message>> {
        self.party_deal(deal_id, viewer_id)?;
        let mut messages = self.messages.filter(|m| m.deal_id == deal_id);
        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }

    /// Mark the counterparty's messages as read for `viewer_id`.
    pub fn mark_messages_read(&self, deal_id: Uuid, viewer_id: Uuid) -> DealRoomResult<usize> {
        self.party_deal(deal_id, viewer_id)?;
        Ok(self.messages.update_where(
            |m| m.deal_id == deal_id && m.sender_id != viewer_id,
            |m| !std::mem::replace(&mut m.read, true),
        ))
    }

    pub fn upload_document(
        &self,
        deal_id: Uuid,
        uploader_id: Uuid,
        upload: DocumentUpload,
    ) -> DealRoomResult<Document> {
        let deal = self
            .party_deal(deal_id, uploader_id)
            .map_err(|err| self.reject("upload_document", err))?;
        let name = upload.name.trim();
        if name.is_empty() {
            return Err(self.reject(
                "upload_document",
                DealRoomError::validation("Document name is required"),
            ));
        }

        let counterparty = deal.counterparty(uploader_id);
        let mut access_control = vec![uploader_id];
        if upload.share_with_counterparty {
            access_control.extend(counterparty);
        }
        let document = Document {
            id: Uuid::new_v4(),
            deal_id,
            name: name.to_string(),
            content_type: upload.content_type,
            size: upload.size,
            uploaded_by: uploader_id,
            created_at: self.now(),
            access_control,
        };
        self.documents.insert(document.id, document.clone())?;
        info!(%deal_id, document_id = %document.id, shared = upload.share_with_counterparty, "document uploaded");

        self.notifier.notify(
            &format!("{} has been successfully uploaded", document.name),
            NoticeKind::Info,
        );
        if let (true, Some(recipient)) = (upload.share_with_counterparty, counterparty) {
            let uploader = self.user(uploader_id).map(|u| u.name).unwrap_or_default();
            self.record_notification(
                recipient,
                NotificationKind::DocumentUpload,
                format!("{uploader} uploaded a new document"),
                Some(deal_id),
            );
        }
        Ok(document)
    }

    /// Documents of a deal the viewer has been granted access to.
    pub fn deal_documents(&self, deal_id: Uuid, viewer_id: Uuid) -> DealRoomResult<Vec<Document>> {
        self.require_deal(deal_id)?;
        let mut documents = self
            .documents
            .filter(|d| d.deal_id == deal_id && d.visible_to(viewer_id));
        documents.sort_by_key(|d| d.created_at);
        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
use crate::{clock::ManualClock, notify::NoticeBuffer, service::DealDraft};
    use chrono::{TimeZone, Utc};
    use entity::{Deal, User, UserRole};
    use rust_decimal_macros::dec;

    struct Setup {
        room: DealRoom,
        notices: Arc<NoticeBuffer>,
        buyer: Uuid,
        seller: Uuid,
        deal: Deal,
    }

    fn setup() -> Setup {
        let notices = Arc::new(NoticeBuffer::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2023, 6, 15, 10, 30, 0).unwrap(),
        ));
        let room = DealRoom::in_memory()
            .with_notifier(notices.clone())
            .with_clock(clock);
        let buyer = User {
            id: Uuid::new_v4(),
            name: "John Buyer".into(),
            email: "john@example.com".into(),
            role: UserRole::Buyer,
            avatar: None,
        };
        let seller = User {
            id: Uuid::new_v4(),
            name: "Sarah Seller".into(),
            email: "sarah@example.com".into(),
            role: UserRole::Seller,
            avatar: None,
        };
        room.users.register(buyer.clone()).unwrap();
        room.users.register(seller.clone()).unwrap();
        let deal = room
            .create_deal(
                DealDraft {
                    title: "Office Equipment Acquisition".into(),
                    description: "Workstations".into(),
                    initial_price: dec!(50000),
                    seller_id: Some(seller.id),
                },
                buyer.id,
            )
            .unwrap();
        Setup {
            room,
            notices,
            buyer: buyer.id,
            seller: seller.id,
            deal,
        }
    }

    #[test]
    fn messages_keep_send_order_under_a_frozen_clock() {
        let s = setup();
        let first = s.room.send_message(s.deal.id, s.buyer, "Hello").unwrap();
        let second = s.room.send_message(s.deal.id, s.seller, "Hi there").unwrap();
        assert!(second.timestamp > first.timestamp);

        let thread = s.room.deal_messages(s.deal.id, s.seller).unwrap();
        let ids: Vec<_> = thread.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);

        let inbox = s.room.notifications_for(s.seller);
        assert!(inbox.iter().any(|n| n.content == "John Buyer sent you a message"));
    }

    #[test]
    fn concurrent_senders_get_distinct_timestamps() {
        let s = setup();
        let barrier = std::sync::Barrier::new(2);
        std::thread::scope(|scope| {
            for sender in [s.buyer, s.seller] {
                let (room, barrier, deal_id) = (&s.room, &barrier, s.deal.id);
                scope.spawn(move || {
                    barrier.wait();
                    for n in 0..20 {
                        room.send_message(deal_id, sender, &format!("offer {n}")).unwrap();
                    }
                });
            }
        });

        let thread = s.room.deal_messages(s.deal.id, s.buyer).unwrap();
        assert_eq!(thread.len(), 40);
        assert!(thread.windows(2).all(|pair| pair[0].timestamp < pair[1].timestamp));
    }

    #[test]
    fn outsiders_cannot_post_or_read() {
        let s = setup();
        let outsider = Uuid::new_v4();
        assert!(matches!(
            s.room.send_message(s.deal.id, outsider, "let me in"),
            Err(DealRoomError::Forbidden(_))
        ));
        assert!(matches!(
            s.room.deal_messages(s.deal.id, outsider),
            Err(DealRoomError::Forbidden(_))
        ));
    }

    #[test]
    fn blank_message_is_rejected() {
        let s = setup();
        assert!(matches!(
            s.room.send_message(s.deal.id, s.buyer, "   "),
            Err(DealRoomError::Validation(_))
        ));
    }

    #[test]
    fn reading_marks_only_incoming_messages() {
        let s = setup();
        s.room.send_message(s.deal.id, s.buyer, "Offer?").unwrap();
        s.room.send_message(s.deal.id, s.seller, "50k").unwrap();
        assert_eq!(s.room.mark_messages_read(s.deal.id, s.buyer).unwrap(), 1);
        assert_eq!(s.room.mark_messages_read(s.deal.id, s.buyer).unwrap(), 0);
    }

    #[test]
    fn private_documents_stay_private() {
        let s = setup();
        let upload = |name: &str, share| DocumentUpload {
            name: name.into(),
            content_type: "application/pdf".into(),
            size: 2_411_724,
            share_with_counterparty: share,
        };
        s.room
            .upload_document(s.deal.id, s.buyer, upload("Contract Agreement.pdf", true))
            .unwrap();
        s.room
            .upload_document(s.deal.id, s.buyer, upload("Notes.pdf", false))
            .unwrap();
        assert_eq!(
            s.notices.last().unwrap().message,
            "Notes.pdf has been successfully uploaded"
        );

        let names = |viewer| {
            s.room
                .deal_documents(s.deal.id, viewer)
                .unwrap()
                .into_iter()
                .map(|d| d.name)
                .collect::<Vec<_>>()
        };
        assert_eq!(names(s.buyer).len(), 2);
        assert_eq!(names(s.seller), vec!["Contract Agreement.pdf".to_string()]);

        let uploads: Vec<_> = s
            .room
            .notifications_for(s.seller)
            .into_iter()
            .filter(|n| n.kind == NotificationKind::DocumentUpload)
            .collect();
        assert_eq!(uploads.len(), 1);
    }
}
