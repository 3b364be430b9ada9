use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use super::pack::UpdatesPack;
use crate::db::{
    ItemsReadRepository, ListsReadRepository, SharesReadRepository, UserProductsReadRepository,
    UsersReadRepository,
};
use crate::error::SyncError;
use crate::models::{ExternalUser, ListItem, User, UserProjection};

/// The pull side: everything that changed for a user after a watermark,
/// including objects the user does not own but can see through shares.
///
/// Empty reads are empty results, never errors; only real storage failures
/// abort the aggregate.
pub struct Receiver {
    lists_read: ListsReadRepository,
    items_read: ItemsReadRepository,
    shares_read: SharesReadRepository,
    users_read: UsersReadRepository,
    user_products_read: UserProductsReadRepository,
}

impl Receiver {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            lists_read: ListsReadRepository::new(pool.clone()),
            items_read: ItemsReadRepository::new(pool.clone()),
            shares_read: SharesReadRepository::new(pool.clone()),
            users_read: UsersReadRepository::new(pool.clone()),
            user_products_read: UserProductsReadRepository::new(pool),
        }
    }

    pub async fn get_updates(
        &self,
        user: &User,
        since: DateTime<Utc>,
    ) -> Result<UpdatesPack, SyncError> {
        let mut pack = UpdatesPack::default();

        // Shares on both sides of the user.
        pack.shares = self
            .shares_read
            .get_updated_for_owner(user.id, since)
            .await?;
        pack.shares
            .extend(self.shares_read.get_updated_to_user(user.id, since).await?);

        // Own lists, then lists shared to the user.
        pack.lists = self
            .lists_read
            .get_updated_for_owner(user.id, since)
            .await?;
        pack.lists.extend(
            self.lists_read
                .get_updated_shared_to_user(user.id, since)
                .await?,
        );

        pack.items = self.collect_items(user.id, since).await?;

        pack.user_products = self
            .user_products_read
            .get_updated_for_owner(user.id, since)
            .await?;

        self.backfill_lists(user.id, &mut pack).await?;
        self.resolve_users(user, &mut pack).await?;

        Ok(pack)
    }

    /// Own-list items unioned with shared-list items by id; the own-list
    /// copy wins on conflict.
    async fn collect_items(
        &self,
        user_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<ListItem>, SyncError> {
        let mut items = self.items_read.get_updated_for_owner(user_id, since).await?;

        let shared = self
            .items_read
            .get_updated_for_shared_list_to_user(user_id, since)
            .await?;

        for item in shared {
            if !items.iter().any(|own| own.id == item.id) {
                items.push(item);
            }
        }

        Ok(items)
    }

    /// A client must always receive the parent list of every item. Any
    /// list referenced by a returned item and missing from the pack is
    /// fetched and appended: own lists first, then lists shared to the
    /// user.
    async fn backfill_lists(&self, user_id: Uuid, pack: &mut UpdatesPack) -> Result<(), SyncError> {
        let mut missing: Vec<Uuid> = Vec::new();
        for item in &pack.items {
            if !pack.has_list(item.list_id) && !missing.contains(&item.list_id) {
                missing.push(item.list_id);
            }
        }

        if missing.is_empty() {
            return Ok(());
        }

        let own = self
            .lists_read
            .get_for_ids_and_owner(&missing, user_id)
            .await?;
        missing.retain(|id| !own.iter().any(|list| list.id == *id));
        pack.lists.extend(own);

        if !missing.is_empty() {
            let shared = self
                .lists_read
                .get_shared_to_user_for_ids(&missing, user_id)
                .await?;
            pack.lists.extend(shared);
        }

        Ok(())
    }

    /// Full profile for the requesting identity, reduced external
    /// projection for every other referenced user.
    async fn resolve_users(&self, current: &User, pack: &mut UpdatesPack) -> Result<(), SyncError> {
        let ids = pack.user_ids_in_objects();
        let users = self.users_read.get_users_for_ids(&ids).await?;

        pack.users = users
            .into_iter()
            .map(|user| {
                if user.id == current.id {
                    UserProjection::Own(user)
                } else {
                    UserProjection::External(ExternalUser::from(&user))
                }
            })
            .collect();

        Ok(())
    }
}
