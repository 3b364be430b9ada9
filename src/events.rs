//! Domain events produced during a reconciliation pass.
//!
//! Events are buffered while the transaction is open and published only
//! after commit, so listeners never observe phantom state. Both event
//! families are closed enums; listeners match them exhaustively.

use uuid::Uuid;

use crate::models::{List, ListItem, User};

/// Share lifecycle events, delivered to a single target user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareEventKind {
    /// Owner invited someone to a list.
    Invite,
    /// Invitee accepted; the owner is notified.
    Accept,
    /// Invitee refused; the owner is notified.
    Refuse,
    /// Owner revoked an accepted share; the invitee is notified.
    ShareDeleted,
    /// Owner deleted a shared list outright.
    ListDeleted,
}

#[derive(Debug, Clone)]
pub struct ShareEvent {
    pub kind: ShareEventKind,
    pub list: List,
    /// The user whose push produced the event.
    pub actor: User,
    pub target_user_id: Uuid,
}

impl ShareEvent {
    pub fn new(kind: ShareEventKind, list: List, actor: User, target_user_id: Uuid) -> Self {
        ShareEvent {
            kind,
            list,
            actor,
            target_user_id,
        }
    }
}

/// Item (goods) lifecycle events, fanned out to every recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoodsEventKind {
    Create,
    Change,
    Check,
    Uncheck,
    Delete,
}

impl GoodsEventKind {
    /// Select the event kind for a write: creation, a mark transition, a
    /// fresh soft-delete, or a plain field change.
    pub fn for_write(new: &ListItem, existing: Option<&ListItem>) -> Self {
        let Some(existing) = existing else {
            return GoodsEventKind::Create;
        };

        if new.is_marked && !existing.is_marked {
            GoodsEventKind::Check
        } else if !new.is_marked && existing.is_marked {
            GoodsEventKind::Uncheck
        } else if new.is_deleted && !existing.is_deleted {
            GoodsEventKind::Delete
        } else {
            GoodsEventKind::Change
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoodsEvent {
    pub kind: GoodsEventKind,
    pub item: ListItem,
    pub list_name: String,
    pub actor: User,
    pub target_user_ids: Vec<Uuid>,
}

impl GoodsEvent {
    /// Duplicate recipients are dropped, preserving first-seen order.
    pub fn new(
        kind: GoodsEventKind,
        item: ListItem,
        actor: User,
        list_name: String,
        target_user_ids: Vec<Uuid>,
    ) -> Self {
        let mut seen = Vec::with_capacity(target_user_ids.len());
        for id in target_user_ids {
            if !seen.contains(&id) {
                seen.push(id);
            }
        }

        GoodsEvent {
            kind,
            item,
            list_name,
            actor,
            target_user_ids: seen,
        }
    }
}
