use chrono::Utc;
use sqlx::SqliteConnection;
use uuid::Uuid;

use super::access::Authority;
use super::lists_collection::ListsCollection;
use crate::db;
use crate::error::SyncError;
use crate::models::List;

/// Reconciles incoming list mutations. A user may only mutate lists they
/// own, and the template flag is immutable once a list exists.
pub struct ListsUpdater {
    user_id: Uuid,
}

impl ListsUpdater {
    pub fn new(user_id: Uuid) -> Self {
        Self { user_id }
    }

    pub async fn run(
        &self,
        conn: &mut SqliteConnection,
        cache: &mut ListsCollection<'_>,
        lists: &[List],
    ) -> Result<(), SyncError> {
        if lists.is_empty() {
            return Ok(());
        }

        let mut to_create: Vec<List> = Vec::new();
        let mut to_update: Vec<List> = Vec::new();

        for list in lists {
            if Authority::for_list(list.owner_id, self.user_id, &[]) != Authority::Owner {
                return Err(SyncError::forbidden(format!(
                    "list {} belongs to another user",
                    list.id
                )));
            }

            let mut list = list.clone();
            list.received_at = Utc::now();

            match cache.get(list.id, self.user_id).await? {
                None => to_create.push(list),
                Some(existing) => {
                    if list.is_equal(&existing) {
                        continue;
                    }

                    if existing.is_template != list.is_template {
                        return Err(SyncError::validation(format!(
                            "template flag is immutable for list {}",
                            existing.id
                        )));
                    }

                    to_update.push(list);
                }
            }
        }

        for list in to_update {
            db::update_list(&mut *conn, &list).await?;
            cache.add(list);
        }

        for list in to_create {
            db::create_list(&mut *conn, &list).await?;
            cache.add(list);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_support::test_pool;
    use crate::db::ListsReadRepository;
    use crate::models::epoch;
    use chrono::TimeZone;

    fn list(owner_id: Uuid) -> List {
        List {
            id: Uuid::new_v4(),
            owner_id,
            name: "Groceries".into(),
            is_template: false,
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1_700_000_100, 0).unwrap(),
            received_at: epoch(),
            is_deleted: false,
        }
    }

    #[tokio::test]
    async fn test_creates_new_list_and_caches_it() {
        let (pool, _dir) = test_pool().await;
        let repository = ListsReadRepository::new(pool.clone());
        let mut cache = ListsCollection::new(&repository);
        let mut conn = pool.acquire().await.unwrap();

        let owner = Uuid::new_v4();
        let incoming = list(owner);

        let updater = ListsUpdater::new(owner);
        updater
            .run(&mut conn, &mut cache, std::slice::from_ref(&incoming))
            .await
            .unwrap();

        let stored = repository
            .get_for_id_and_owner(incoming.id, owner)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_equal(&incoming));
        // received_at is server-assigned on ingestion.
        assert!(stored.received_at.timestamp() > 0);

        let cached = cache.get(incoming.id, owner).await.unwrap();
        assert!(cached.is_some());
    }

    #[tokio::test]
    async fn test_foreign_list_is_forbidden() {
        let (pool, _dir) = test_pool().await;
        let repository = ListsReadRepository::new(pool.clone());
        let mut cache = ListsCollection::new(&repository);
        let mut conn = pool.acquire().await.unwrap();

        let incoming = list(Uuid::new_v4());
        let updater = ListsUpdater::new(Uuid::new_v4());

        let err = updater
            .run(&mut conn, &mut cache, std::slice::from_ref(&incoming))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_equal_list_is_skipped() {
        let (pool, _dir) = test_pool().await;
        let repository = ListsReadRepository::new(pool.clone());
        let mut conn = pool.acquire().await.unwrap();

        let owner = Uuid::new_v4();
        let incoming = list(owner);
        let updater = ListsUpdater::new(owner);

        {
            let mut cache = ListsCollection::new(&repository);
            updater
                .run(&mut conn, &mut cache, std::slice::from_ref(&incoming))
                .await
                .unwrap();
        }

        let first = repository
            .get_for_id_and_owner(incoming.id, owner)
            .await
            .unwrap()
            .unwrap();

        // Replay in a fresh pass: the equal record must not be rewritten,
        // so received_at stays what the first pass assigned.
        {
            let mut cache = ListsCollection::new(&repository);
            updater
                .run(&mut conn, &mut cache, std::slice::from_ref(&incoming))
                .await
                .unwrap();
        }

        let second = repository
            .get_for_id_and_owner(incoming.id, owner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.received_at, second.received_at);
    }

    #[tokio::test]
    async fn test_template_flag_is_immutable() {
        let (pool, _dir) = test_pool().await;
        let repository = ListsReadRepository::new(pool.clone());
        let mut conn = pool.acquire().await.unwrap();

        let owner = Uuid::new_v4();
        let mut incoming = list(owner);
        let updater = ListsUpdater::new(owner);

        {
            let mut cache = ListsCollection::new(&repository);
            updater
                .run(&mut conn, &mut cache, std::slice::from_ref(&incoming))
                .await
                .unwrap();
        }

        incoming.is_template = true;
        incoming.updated_at = Utc.timestamp_opt(1_700_000_200, 0).unwrap();

        let mut cache = ListsCollection::new(&repository);
        let err = updater
            .run(&mut conn, &mut cache, std::slice::from_ref(&incoming))
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
    }

    #[tokio::test]
    async fn test_update_changes_fields() {
        let (pool, _dir) = test_pool().await;
        let repository = ListsReadRepository::new(pool.clone());
        let mut conn = pool.acquire().await.unwrap();

        let owner = Uuid::new_v4();
        let mut incoming = list(owner);
        let updater = ListsUpdater::new(owner);

        {
            let mut cache = ListsCollection::new(&repository);
            updater
                .run(&mut conn, &mut cache, std::slice::from_ref(&incoming))
                .await
                .unwrap();
        }

        incoming.name = "Hardware".into();
        incoming.updated_at = Utc.timestamp_opt(1_700_000_200, 0).unwrap();

        let mut cache = ListsCollection::new(&repository);
        updater
            .run(&mut conn, &mut cache, std::slice::from_ref(&incoming))
            .await
            .unwrap();

        let stored = repository
            .get_for_id_and_owner(incoming.id, owner)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.name, "Hardware");
    }
}
