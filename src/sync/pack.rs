use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{List, ListItem, ListShare, User, UserProduct, UserProjection};

/// One client push: every locally-made mutation since the device's last
/// successful sync, in one transaction-sized unit.
#[derive(Debug, Default, Deserialize)]
pub struct SyncBatch {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub lists: Vec<List>,
    #[serde(default)]
    pub items: Vec<ListItem>,
    #[serde(default)]
    pub shares: Vec<ListShare>,
    #[serde(default)]
    pub user_products: Vec<UserProduct>,
}

impl SyncBatch {
    /// Structural validation before the reconciliation pass. Collects
    /// every problem so a client sees the full picture at once.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        for user in &self.users {
            if let Err(e) = user.validate() {
                errors.push(format!("error in user {}: {e}", user.id));
            }
        }
        for list in &self.lists {
            if let Err(e) = list.validate() {
                errors.push(format!("error in list {}: {e}", list.id));
            }
        }
        for item in &self.items {
            if let Err(e) = item.validate() {
                errors.push(format!("error in item {}: {e}", item.id));
            }
        }
        for share in &self.shares {
            if let Err(e) = share.validate() {
                errors.push(format!("error in share {}: {e}", share.id));
            }
        }
        for product in &self.user_products {
            if let Err(e) = product.validate() {
                errors.push(format!("error in user product {}: {e}", product.id));
            }
        }

        errors
    }
}

/// One pull response: everything that changed for a user since the
/// watermark, closed over parent lists and referenced identities.
#[derive(Debug, Default, Serialize)]
pub struct UpdatesPack {
    pub users: Vec<UserProjection>,
    pub lists: Vec<List>,
    pub items: Vec<ListItem>,
    pub shares: Vec<ListShare>,
    pub user_products: Vec<UserProduct>,
}

impl UpdatesPack {
    pub fn has_list(&self, list_id: Uuid) -> bool {
        self.lists.iter().any(|list| list.id == list_id)
    }

    /// Every user id referenced by a share or a list in the pack,
    /// deduplicated, for identity resolution.
    pub fn user_ids_in_objects(&self) -> Vec<Uuid> {
        let mut ids: Vec<Uuid> = Vec::new();

        for share in &self.shares {
            for id in [share.to_user_id, share.owner_id] {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
        }
        for list in &self.lists {
            if !ids.contains(&list.owner_id) {
                ids.push(list.owner_id);
            }
        }

        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{epoch, ShareStatus};
    use chrono::{TimeZone, Utc};

    #[test]
    fn validate_collects_all_errors() {
        let batch = SyncBatch {
            lists: vec![List {
                id: Uuid::new_v4(),
                owner_id: Uuid::new_v4(),
                name: String::new(), // invalid
                is_template: false,
                created_at: Utc.timestamp_opt(1, 0).unwrap(),
                updated_at: Utc.timestamp_opt(1, 0).unwrap(),
                received_at: epoch(),
                is_deleted: false,
            }],
            items: vec![ListItem {
                id: Uuid::new_v4(),
                list_id: Uuid::new_v4(),
                name: "Milk".into(),
                value: String::new(),
                is_marked: true,
                user_marked_by: None, // invalid
                created_at: Utc.timestamp_opt(1, 0).unwrap(),
                updated_at: Utc.timestamp_opt(1, 0).unwrap(),
                received_at: epoch(),
                is_deleted: false,
            }],
            ..Default::default()
        };

        let errors = batch.validate();
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn user_ids_cover_shares_and_lists_without_duplicates() {
        let owner = Uuid::new_v4();
        let invitee = Uuid::new_v4();

        let pack = UpdatesPack {
            shares: vec![ListShare {
                id: Uuid::new_v4(),
                list_id: Uuid::new_v4(),
                owner_id: owner,
                to_user_id: invitee,
                status: ShareStatus::Accepted,
                created_at: Utc.timestamp_opt(1, 0).unwrap(),
                updated_at: Utc.timestamp_opt(1, 0).unwrap(),
                received_at: epoch(),
                is_deleted: false,
            }],
            lists: vec![List {
                id: Uuid::new_v4(),
                owner_id: owner,
                name: "Groceries".into(),
                is_template: false,
                created_at: Utc.timestamp_opt(1, 0).unwrap(),
                updated_at: Utc.timestamp_opt(1, 0).unwrap(),
                received_at: epoch(),
                is_deleted: false,
            }],
            ..Default::default()
        };

        let ids = pack.user_ids_in_objects();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&owner));
        assert!(ids.contains(&invitee));
    }

    #[test]
    fn empty_batch_deserializes() {
        let batch: SyncBatch = serde_json::from_str("{}").unwrap();
        assert!(batch.lists.is_empty());
        assert!(batch.validate().is_empty());
    }
}
