use chrono::Utc;
use sqlx::SqliteConnection;

use super::access::Authority;
use super::event_collection::EventCollection;
use super::lists_collection::ListsCollection;
use crate::db::{self, SharesReadRepository, UsersReadRepository};
use crate::error::SyncError;
use crate::events::{ShareEvent, ShareEventKind};
use crate::models::{List, ListShare, ShareStatus, User};

/// Reconciles share mutations. A share is owned jointly: the sharer holds
/// every field except `status`, the invitee holds only `status` (and only
/// away from `New`), so the merge branches by which side submitted it.
pub struct SharesUpdater<'a> {
    user: &'a User,
    shares_read: &'a SharesReadRepository,
    users_read: &'a UsersReadRepository,
}

impl<'a> SharesUpdater<'a> {
    pub fn new(
        user: &'a User,
        shares_read: &'a SharesReadRepository,
        users_read: &'a UsersReadRepository,
    ) -> Self {
        Self {
            user,
            shares_read,
            users_read,
        }
    }

    pub async fn run(
        &self,
        conn: &mut SqliteConnection,
        cache: &mut ListsCollection<'_>,
        events: &mut EventCollection,
        shares: &[ListShare],
    ) -> Result<(), SyncError> {
        if shares.is_empty() {
            return Ok(());
        }

        for share in shares {
            // A share is meaningless without its list. The cache also makes
            // lists created earlier in this batch visible.
            let list = cache
                .get(share.list_id, share.owner_id)
                .await?
                .ok_or_else(|| {
                    SyncError::not_found(format!(
                        "list {} (owner {}) for share {}",
                        share.list_id, share.owner_id, share.id
                    ))
                })?;

            if list.owner_id != share.owner_id {
                return Err(SyncError::conflict(format!(
                    "list owner differs from share owner for share {}",
                    share.id
                )));
            }

            match Authority::for_share(share, self.user.id) {
                Authority::Owner => {
                    if self
                        .users_read
                        .get_user(share.to_user_id)
                        .await?
                        .is_none()
                    {
                        return Err(SyncError::not_found(format!(
                            "invited user {} for share {}",
                            share.to_user_id, share.id
                        )));
                    }

                    self.sync_own_share(&mut *conn, events, share, &list).await?;
                }
                Authority::Invitee => {
                    self.sync_share_for_user(&mut *conn, events, share, &list)
                        .await?;
                }
                Authority::None => {
                    return Err(SyncError::forbidden(format!(
                        "share {} does not involve the submitting user",
                        share.id
                    )));
                }
            }
        }

        Ok(())
    }

    /// Owner side: create new shares, or update everything except the
    /// stored status.
    async fn sync_own_share(
        &self,
        conn: &mut SqliteConnection,
        events: &mut EventCollection,
        share: &ListShare,
        list: &List,
    ) -> Result<(), SyncError> {
        if list.owner_id != self.user.id {
            return Err(SyncError::conflict(format!(
                "list {} is not owned by the submitting user",
                list.id
            )));
        }

        let mut share = share.clone();
        share.received_at = Utc::now();

        let existing = self.shares_read.get_share(share.id, list.owner_id).await?;

        let Some(existing) = existing else {
            // Fresh invitation. Anything but New means the client is trying
            // to skip the invitee's half of the handshake.
            if share.status != ShareStatus::New {
                return Err(SyncError::validation(format!(
                    "wrong status for new share {}",
                    share.id
                )));
            }

            db::create_share(&mut *conn, &share).await?;
            events.add_share_event(ShareEvent::new(
                ShareEventKind::Invite,
                list.clone(),
                self.user.clone(),
                share.to_user_id,
            ));

            return Ok(());
        };

        if share.is_equal(&existing) {
            return Ok(());
        }

        // Revoking an accepted share: tell the invitee their access is gone.
        if existing.status == ShareStatus::Accepted && !existing.is_deleted && share.is_deleted {
            events.add_share_event(ShareEvent::new(
                ShareEventKind::ShareDeleted,
                list.clone(),
                self.user.clone(),
                share.to_user_id,
            ));
        }

        // The owner can never change the status, only the invitee can.
        share.status = existing.status;

        db::update_share(&mut *conn, &share).await?;

        Ok(())
    }

    /// Invitee side: only `status` and `updated_at` are taken from the
    /// submitted object; everything else stays as stored.
    async fn sync_share_for_user(
        &self,
        conn: &mut SqliteConnection,
        events: &mut EventCollection,
        share: &ListShare,
        list: &List,
    ) -> Result<(), SyncError> {
        let existing = self
            .shares_read
            .get_share(share.id, share.owner_id)
            .await?
            .ok_or_else(|| {
                SyncError::not_found(format!("share {} addressed to the user", share.id))
            })?;

        if existing.status != ShareStatus::New && share.status == ShareStatus::New {
            return Err(SyncError::validation(format!(
                "share {} status can not return to new",
                share.id
            )));
        }

        let old_status = existing.status;

        let mut merged = existing;
        merged.updated_at = share.updated_at;
        merged.status = share.status;
        merged.received_at = Utc::now();

        db::update_share(&mut *conn, &merged).await?;

        if old_status != share.status {
            let kind = match share.status {
                ShareStatus::Accepted => Some(ShareEventKind::Accept),
                ShareStatus::Refused => Some(ShareEventKind::Refuse),
                ShareStatus::New => None,
            };

            if let Some(kind) = kind {
                events.add_share_event(ShareEvent::new(
                    kind,
                    list.clone(),
                    self.user.clone(),
                    share.owner_id,
                ));
            }
        }

        Ok(())
    }
}
