use std::collections::HashMap;

use uuid::Uuid;

use crate::db::ListsReadRepository;
use crate::error::SyncError;
use crate::models::List;

/// Request-scoped cache of lists touched during one reconciliation pass.
///
/// Later updaters must observe lists the earlier ones created or updated
/// in the still-open transaction; pool-backed reads cannot see those, so
/// every written list is pushed in here and every updater lookup goes
/// through here first.
///
/// Not safe for concurrent use. A pass runs on a single task, which is the
/// only reason no locking is needed.
pub struct ListsCollection<'a> {
    lists: HashMap<Uuid, List>,
    repository: &'a ListsReadRepository,
}

impl<'a> ListsCollection<'a> {
    pub fn new(repository: &'a ListsReadRepository) -> Self {
        Self {
            lists: HashMap::new(),
            repository,
        }
    }

    /// Cached list by id, falling back to an owner-scoped storage read.
    /// Misses are not cached; a later call retries the read.
    pub async fn get(&mut self, list_id: Uuid, owner_id: Uuid) -> Result<Option<List>, SyncError> {
        if !self.lists.contains_key(&list_id) {
            match self.repository.get_for_id_and_owner(list_id, owner_id).await? {
                Some(list) => {
                    self.lists.insert(list_id, list);
                }
                None => return Ok(None),
            }
        }

        Ok(self.lists.get(&list_id).cloned())
    }

    pub fn add(&mut self, list: List) {
        self.lists.insert(list.id, list);
    }
}
