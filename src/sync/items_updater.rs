use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::access::Authority;
use super::event_collection::EventCollection;
use super::lists_collection::ListsCollection;
use crate::db::{self, ListsReadRepository, SharesReadRepository, UsersReadRepository};
use crate::error::SyncError;
use crate::events::{GoodsEvent, GoodsEventKind};
use crate::models::{List, ListItem, User};

/// Reconciles item mutations against the submitter's own lists and lists
/// shared with the submitter.
///
/// Own-list items enforce template immutability; shared-list items are
/// deliberately permissive (no template check, Refused shares still
/// accepted) because the refusal may have happened after the edit was made
/// offline.
pub struct ItemsUpdater<'a> {
    user: &'a User,
    lists_read: &'a ListsReadRepository,
    shares_read: &'a SharesReadRepository,
    users_read: &'a UsersReadRepository,
    /// Notification recipients per list, resolved once per pass.
    recipients_by_list: HashMap<Uuid, Vec<Uuid>>,
}

impl<'a> ItemsUpdater<'a> {
    pub fn new(
        user: &'a User,
        lists_read: &'a ListsReadRepository,
        shares_read: &'a SharesReadRepository,
        users_read: &'a UsersReadRepository,
    ) -> Self {
        Self {
            user,
            lists_read,
            shares_read,
            users_read,
            recipients_by_list: HashMap::new(),
        }
    }

    /// `batch_lists` are the lists submitted in the same batch: a brand-new
    /// own list is recognized before it is visible to pool reads.
    pub async fn run(
        &mut self,
        conn: &mut SqliteConnection,
        cache: &mut ListsCollection<'_>,
        events: &mut EventCollection,
        items: &[ListItem],
        batch_lists: &[List],
    ) -> Result<(), SyncError> {
        if items.is_empty() {
            return Ok(());
        }

        let mut list_ids: Vec<Uuid> = Vec::new();
        for item in items {
            if !list_ids.contains(&item.list_id) {
                list_ids.push(item.list_id);
            }
        }

        // Own lists: stored ones plus those arriving in this very batch.
        let mut own_lists: HashMap<Uuid, List> = HashMap::new();
        for list in self
            .lists_read
            .get_for_ids_and_owner(&list_ids, self.user.id)
            .await?
        {
            own_lists.insert(list.id, list);
        }
        for list in batch_lists {
            if list.owner_id == self.user.id {
                own_lists.insert(list.id, list.clone());
            }
        }

        // Shares addressed to the submitter for the touched lists.
        let mut shares_by_list: HashMap<Uuid, Vec<crate::models::ListShare>> = HashMap::new();
        for share in self
            .shares_read
            .get_for_user_for_list_ids(&list_ids, self.user.id)
            .await?
        {
            shares_by_list.entry(share.list_id).or_default().push(share);
        }

        let mut own_items: Vec<ListItem> = Vec::new();
        let mut shared_items: Vec<ListItem> = Vec::new();

        for item in items {
            if let Some(list) = own_lists.get(&item.list_id) {
                // A template list is a reusable checklist; nothing on it is
                // ever "bought".
                if item.is_marked && list.is_template {
                    return Err(SyncError::validation(format!(
                        "forbidden to mark item {} on template list {}",
                        item.id, list.id
                    )));
                }

                own_items.push(item.clone());
                continue;
            }

            if let Some(shares) = shares_by_list.get(&item.list_id) {
                let list_owner = shares.first().map(|s| s.owner_id).unwrap_or_default();
                if Authority::for_list(list_owner, self.user.id, shares) == Authority::Invitee {
                    shared_items.push(item.clone());
                }
                // A share that is deleted or still New leaves the item
                // unapplied without failing the batch.
                continue;
            }

            return Err(SyncError::validation(format!(
                "list {} not found for item {}",
                item.list_id, item.id
            )));
        }

        self.check_marked_users(items).await?;

        for item in &mut own_items {
            self.apply_own_item(&mut *conn, cache, events, item).await?;
        }

        for item in &mut shared_items {
            self.apply_shared_item(&mut *conn, events, item).await?;
        }

        Ok(())
    }

    /// Every `user_marked_by` must reference an existing user.
    async fn check_marked_users(&self, items: &[ListItem]) -> Result<(), SyncError> {
        let mut marked_ids: Vec<Uuid> = Vec::new();
        for item in items {
            if let Some(id) = item.user_marked_by {
                if !marked_ids.contains(&id) {
                    marked_ids.push(id);
                }
            }
        }

        if marked_ids.is_empty() {
            return Ok(());
        }

        let found: HashSet<Uuid> = self
            .users_read
            .get_users_for_ids(&marked_ids)
            .await?
            .into_iter()
            .map(|user| user.id)
            .collect();

        for id in &marked_ids {
            if !found.contains(id) {
                return Err(SyncError::validation(format!(
                    "user_marked_by references unknown user {id}"
                )));
            }
        }

        Ok(())
    }

    async fn apply_own_item(
        &mut self,
        conn: &mut SqliteConnection,
        cache: &mut ListsCollection<'_>,
        events: &mut EventCollection,
        item: &mut ListItem,
    ) -> Result<(), SyncError> {
        let list = cache
            .get(item.list_id, self.user.id)
            .await?
            .ok_or_else(|| {
                SyncError::not_found(format!("list {} for item {}", item.list_id, item.id))
            })?;

        item.received_at = Utc::now();

        let existing = db::get_item(&mut *conn, item.id, item.list_id).await?;

        let Some(existing) = existing else {
            db::create_item(&mut *conn, item).await?;
            self.notify(events, item, None, &list).await;
            return Ok(());
        };

        if existing.is_equal(item) {
            return Ok(());
        }

        if list.is_template && item.is_marked {
            return Err(SyncError::validation(format!(
                "forbidden to mark item {} on template list {}",
                item.id, list.id
            )));
        }

        db::update_item(&mut *conn, item).await?;
        self.notify(events, item, Some(&existing), &list).await;

        Ok(())
    }

    async fn apply_shared_item(
        &mut self,
        conn: &mut SqliteConnection,
        events: &mut EventCollection,
        item: &mut ListItem,
    ) -> Result<(), SyncError> {
        item.received_at = Utc::now();

        let lists = self
            .lists_read
            .get_shared_to_user_for_ids(&[item.list_id], self.user.id)
            .await?;
        let Some(list) = lists.first() else {
            return Err(SyncError::not_found(format!(
                "shared list {} for item {}",
                item.list_id, item.id
            )));
        };

        let existing = db::get_item(&mut *conn, item.id, item.list_id).await?;

        let Some(existing) = existing else {
            // Collaborators may create items in lists shared with them.
            db::create_item(&mut *conn, item).await?;
            self.notify(events, item, None, list).await;
            return Ok(());
        };

        if existing.is_equal(item) {
            return Ok(());
        }

        // Collaborators currently have full mutation rights here, template
        // lists included.
        db::update_item(&mut *conn, item).await?;
        self.notify(events, item, Some(&existing), list).await;

        Ok(())
    }

    async fn notify(
        &mut self,
        events: &mut EventCollection,
        item: &ListItem,
        existing: Option<&ListItem>,
        list: &List,
    ) {
        let kind = GoodsEventKind::for_write(item, existing);

        let mut targets = self.recipients_for_list(list.id, list.owner_id).await;
        // A foreign list means the submitter is a collaborator; the owner
        // hears about it too.
        if list.owner_id != self.user.id {
            targets.push(list.owner_id);
        }

        events.add_goods_event(GoodsEvent::new(
            kind,
            item.clone(),
            self.user.clone(),
            list.name.clone(),
            targets,
        ));
    }

    /// Accepted invitees of a list, minus the submitter, resolved once per
    /// list per pass.
    async fn recipients_for_list(&mut self, list_id: Uuid, owner_id: Uuid) -> Vec<Uuid> {
        if let Some(ids) = self.recipients_by_list.get(&list_id) {
            return ids.clone();
        }

        let ids: Vec<Uuid> = match self
            .shares_read
            .get_accepted_user_ids_for_list(list_id, owner_id)
            .await
        {
            Ok(ids) => ids.into_iter().filter(|id| *id != self.user.id).collect(),
            Err(e) => {
                tracing::error!("failed to resolve recipients for list {list_id}: {e}");
                return Vec::new();
            }
        };

        self.recipients_by_list.insert(list_id, ids.clone());
        ids
    }
}
