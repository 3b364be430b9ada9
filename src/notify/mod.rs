//! Post-commit event hand-off and notification delivery.
//!
//! The orchestrator publishes through an injected [`EventPublisher`]
//! rather than global channels; each event family has its own bounded
//! queue and its own listener task. A slow listener backpressures the
//! publishing request after commit, which is a deliberate trade-off.
//! Push/SMS transport is out of scope; listeners persist notification
//! rows and leave delivery to whatever tails that table.

use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::db::NotificationsRepository;
use crate::events::{GoodsEvent, GoodsEventKind, ShareEvent, ShareEventKind};
use crate::models::{Notification, NotificationKind};
use crate::sync::EventCollection;

/// Sending half of the event boundary, cloned into every request.
#[derive(Clone)]
pub struct EventPublisher {
    shares_tx: mpsc::Sender<ShareEvent>,
    goods_tx: mpsc::Sender<GoodsEvent>,
}

impl EventPublisher {
    /// Build a publisher and the matching receiver pair.
    pub fn channel(
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ShareEvent>, mpsc::Receiver<GoodsEvent>) {
        let (shares_tx, shares_rx) = mpsc::channel(capacity);
        let (goods_tx, goods_rx) = mpsc::channel(capacity);

        (
            Self {
                shares_tx,
                goods_tx,
            },
            shares_rx,
            goods_rx,
        )
    }

    /// Drain a committed pass's events onto the queues, FIFO within each
    /// kind. Only called after the transaction has committed; a dropped
    /// listener loses events but never the committed data.
    pub async fn publish(&self, events: EventCollection) {
        let (share_events, goods_events) = events.into_parts();

        for event in share_events {
            if self.shares_tx.send(event).await.is_err() {
                tracing::error!("share event listener is gone; dropping remaining share events");
                break;
            }
        }

        for event in goods_events {
            if self.goods_tx.send(event).await.is_err() {
                tracing::error!("goods event listener is gone; dropping remaining goods events");
                break;
            }
        }
    }
}

/// Consumes share lifecycle events and persists one notification for the
/// single target user of each.
pub struct ShareChangeListener {
    repository: NotificationsRepository,
}

impl ShareChangeListener {
    pub fn new(repository: NotificationsRepository) -> Self {
        Self { repository }
    }

    pub async fn run(self, mut events: mpsc::Receiver<ShareEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(&event).await {
                tracing::error!("failed to handle share event: {e}");
            }
        }
    }

    async fn handle(&self, event: &ShareEvent) -> Result<(), sqlx::Error> {
        let phone = event.actor.phone;
        let list_name = &event.list.name;

        let (kind, message) = match event.kind {
            ShareEventKind::Invite => (
                NotificationKind::ListInvite,
                format!("User {phone} invited you to the list \"{list_name}\""),
            ),
            ShareEventKind::Accept => (
                NotificationKind::ListJoining,
                format!("User {phone} joined the list \"{list_name}\""),
            ),
            ShareEventKind::Refuse => (
                NotificationKind::ListDetachment,
                format!("User {phone} left the list \"{list_name}\""),
            ),
            ShareEventKind::ShareDeleted => (
                NotificationKind::ListShareDelete,
                format!("User {phone} stopped sharing the list \"{list_name}\""),
            ),
            ShareEventKind::ListDeleted => (
                NotificationKind::ListDelete,
                format!("User {phone} deleted the list \"{list_name}\""),
            ),
        };

        self.repository
            .create(&Notification {
                id: Uuid::new_v4(),
                kind,
                message,
                user_id: event.actor.id,
                user_phone: event.actor.phone,
                list_id: event.list.id,
                item_id: None,
                target_user_id: event.target_user_id,
                created_at: Utc::now(),
            })
            .await
    }
}

/// Consumes goods lifecycle events and persists one notification per
/// recipient.
pub struct GoodsChangeListener {
    repository: NotificationsRepository,
}

impl GoodsChangeListener {
    pub fn new(repository: NotificationsRepository) -> Self {
        Self { repository }
    }

    pub async fn run(self, mut events: mpsc::Receiver<GoodsEvent>) {
        while let Some(event) = events.recv().await {
            if let Err(e) = self.handle(&event).await {
                tracing::error!("failed to handle goods event: {e}");
            }
        }
    }

    async fn handle(&self, event: &GoodsEvent) -> Result<(), sqlx::Error> {
        let phone = event.actor.phone;
        let item_name = &event.item.name;
        let list_name = &event.list_name;

        let (kind, message) = match event.kind {
            GoodsEventKind::Create => (
                NotificationKind::GoodsCreate,
                format!("User {phone} added \"{item_name}\" to \"{list_name}\""),
            ),
            GoodsEventKind::Change => (
                NotificationKind::GoodsChange,
                format!("User {phone} changed \"{item_name}\" in \"{list_name}\""),
            ),
            GoodsEventKind::Check => (
                NotificationKind::GoodsCheck,
                format!("User {phone} checked off \"{item_name}\" in \"{list_name}\""),
            ),
            GoodsEventKind::Uncheck => (
                NotificationKind::GoodsUncheck,
                format!("User {phone} unchecked \"{item_name}\" in \"{list_name}\""),
            ),
            GoodsEventKind::Delete => (
                NotificationKind::GoodsDelete,
                format!("User {phone} removed \"{item_name}\" from \"{list_name}\""),
            ),
        };

        for target_user_id in &event.target_user_ids {
            self.repository
                .create(&Notification {
                    id: Uuid::new_v4(),
                    kind,
                    message: message.clone(),
                    user_id: event.actor.id,
                    user_phone: event.actor.phone,
                    list_id: event.item.list_id,
                    item_id: Some(event.item.id),
                    target_user_id: *target_user_id,
                    created_at: Utc::now(),
                })
                .await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::models::{epoch, List, ListItem, User};
    use chrono::TimeZone;

    fn actor() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ann".into(),
            phone: 111,
            email: None,
            created_at: Utc.timestamp_opt(1, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1, 0).unwrap(),
            is_activated: true,
            is_deleted: false,
        }
    }

    fn list(owner_id: Uuid) -> List {
        List {
            id: Uuid::new_v4(),
            owner_id,
            name: "Groceries".into(),
            is_template: false,
            created_at: Utc.timestamp_opt(1, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1, 0).unwrap(),
            received_at: epoch(),
            is_deleted: false,
        }
    }

    fn item(list_id: Uuid) -> ListItem {
        ListItem {
            id: Uuid::new_v4(),
            list_id,
            name: "Milk".into(),
            value: String::new(),
            is_marked: false,
            user_marked_by: None,
            created_at: Utc.timestamp_opt(1, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1, 0).unwrap(),
            received_at: epoch(),
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn test_share_listener_persists_invite_notification() {
        let (pool, _dir) = test_pool().await;
        let listener = ShareChangeListener::new(NotificationsRepository::new(pool.clone()));

        let actor = actor();
        let target = Uuid::new_v4();
        let event = ShareEvent::new(
            ShareEventKind::Invite,
            list(actor.id),
            actor.clone(),
            target,
        );

        listener.handle(&event).await.unwrap();

        let repo = NotificationsRepository::new(pool);
        let stored = repo.get_for_target_user(target).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].kind, NotificationKind::ListInvite);
        assert!(stored[0].message.contains("invited you"));
        assert_eq!(stored[0].user_id, actor.id);
    }

    #[tokio::test]
    async fn test_goods_listener_fans_out_per_recipient() {
        let (pool, _dir) = test_pool().await;
        let listener = GoodsChangeListener::new(NotificationsRepository::new(pool.clone()));

        let actor = actor();
        let shared_list = list(actor.id);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let event = GoodsEvent::new(
            GoodsEventKind::Check,
            item(shared_list.id),
            actor,
            shared_list.name.clone(),
            vec![a, b],
        );

        listener.handle(&event).await.unwrap();

        let repo = NotificationsRepository::new(pool);
        assert_eq!(repo.get_for_target_user(a).await.unwrap().len(), 1);
        let for_b = repo.get_for_target_user(b).await.unwrap();
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].kind, NotificationKind::GoodsCheck);
        assert!(for_b[0].item_id.is_some());
    }

    #[tokio::test]
    async fn test_publisher_delivers_in_order() {
        let (publisher, mut shares_rx, mut goods_rx) = EventPublisher::channel(16);

        let actor = actor();
        let l = list(actor.id);

        let mut events = EventCollection::new();
        events.add_share_event(ShareEvent::new(
            ShareEventKind::Invite,
            l.clone(),
            actor.clone(),
            Uuid::new_v4(),
        ));
        events.add_share_event(ShareEvent::new(
            ShareEventKind::Accept,
            l.clone(),
            actor.clone(),
            Uuid::new_v4(),
        ));
        events.add_goods_event(GoodsEvent::new(
            GoodsEventKind::Create,
            item(l.id),
            actor,
            l.name.clone(),
            vec![],
        ));

        publisher.publish(events).await;

        assert_eq!(shares_rx.recv().await.unwrap().kind, ShareEventKind::Invite);
        assert_eq!(shares_rx.recv().await.unwrap().kind, ShareEventKind::Accept);
        assert_eq!(goods_rx.recv().await.unwrap().kind, GoodsEventKind::Create);
    }
}
