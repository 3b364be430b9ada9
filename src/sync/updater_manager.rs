use sqlx::{SqliteConnection, SqlitePool};

use super::event_collection::EventCollection;
use super::items_updater::ItemsUpdater;
use super::lists_collection::ListsCollection;
use super::lists_updater::ListsUpdater;
use super::pack::SyncBatch;
use super::shares_updater::SharesUpdater;
use super::user_products_updater::UserProductsUpdater;
use crate::db::{self, ListsReadRepository, SharesReadRepository, UsersReadRepository};
use crate::error::SyncError;
use crate::models::User;
use crate::notify::EventPublisher;

/// Orchestrates one reconciliation pass: users, lists, shares, items and
/// user products, strictly in that order, inside a single transaction.
///
/// The order matters: later updaters observe lists the earlier ones put
/// into the shared [`ListsCollection`]. On any error the transaction is
/// dropped and rolls back; events are published only after commit, so a
/// failed batch is invisible to both storage and listeners.
pub struct UpdaterManager {
    pool: SqlitePool,
    publisher: EventPublisher,
}

impl UpdaterManager {
    pub fn new(pool: SqlitePool, publisher: EventPublisher) -> Self {
        Self { pool, publisher }
    }

    pub async fn run_update(&self, user: &User, batch: &SyncBatch) -> Result<(), SyncError> {
        let lists_read = ListsReadRepository::new(self.pool.clone());
        let shares_read = SharesReadRepository::new(self.pool.clone());
        let users_read = UsersReadRepository::new(self.pool.clone());

        let mut events = EventCollection::new();
        let mut cache = ListsCollection::new(&lists_read);

        let mut tx = self.pool.begin().await?;

        self.apply_users(&mut tx, user, &batch.users).await?;

        ListsUpdater::new(user.id)
            .run(&mut tx, &mut cache, &batch.lists)
            .await?;

        SharesUpdater::new(user, &shares_read, &users_read)
            .run(&mut tx, &mut cache, &mut events, &batch.shares)
            .await?;

        ItemsUpdater::new(user, &lists_read, &shares_read, &users_read)
            .run(&mut tx, &mut cache, &mut events, &batch.items, &batch.lists)
            .await?;

        UserProductsUpdater::new(user.id)
            .run(&mut tx, &batch.user_products)
            .await?;

        tx.commit().await?;

        self.publisher.publish(events).await;

        Ok(())
    }

    /// Self-only profile update. Other users' objects may arrive in a
    /// batch and are ignored; the phone number is the login identity and
    /// never changes through sync.
    async fn apply_users(
        &self,
        conn: &mut SqliteConnection,
        current: &User,
        users: &[User],
    ) -> Result<(), SyncError> {
        for user in users {
            if user.id != current.id {
                continue;
            }

            if user.phone != current.phone {
                return Err(SyncError::validation(
                    "phone number can not be changed during sync",
                ));
            }

            db::update_user(&mut *conn, user).await?;
        }

        Ok(())
    }
}
