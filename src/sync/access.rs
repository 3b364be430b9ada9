//! The single access-control check every updater branches on.

use uuid::Uuid;

use crate::models::{ListShare, ShareStatus};

/// What a user may do with a list's entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authority {
    /// Full control (except the fields the invitee owns on a share).
    Owner,
    /// Invited collaborator of the list, or invitee of the share itself.
    Invitee,
    /// No relation: any mutation is rejected.
    None,
}

impl Authority {
    /// Authority over a list, given the shares addressed to the actor for
    /// that list. A share counts once it is not deleted and has left the
    /// `New` state; Refused still counts, since the refusal may postdate
    /// edits made offline.
    pub fn for_list(list_owner_id: Uuid, actor_id: Uuid, shares_to_actor: &[ListShare]) -> Self {
        if list_owner_id == actor_id {
            return Authority::Owner;
        }

        let invited = shares_to_actor.iter().any(|share| {
            share.to_user_id == actor_id && !share.is_deleted && share.status != ShareStatus::New
        });

        if invited {
            Authority::Invitee
        } else {
            Authority::None
        }
    }

    /// Authority over a share object itself: the sharer and the invitee
    /// hold disjoint sets of mutable fields.
    pub fn for_share(share: &ListShare, actor_id: Uuid) -> Self {
        if share.owner_id == actor_id {
            Authority::Owner
        } else if share.to_user_id == actor_id {
            Authority::Invitee
        } else {
            Authority::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::epoch;
    use chrono::{TimeZone, Utc};

    fn share(to_user_id: Uuid, status: ShareStatus, deleted: bool) -> ListShare {
        ListShare {
            id: Uuid::new_v4(),
            list_id: Uuid::new_v4(),
            owner_id: Uuid::new_v4(),
            to_user_id,
            status,
            created_at: Utc.timestamp_opt(1, 0).unwrap(),
            updated_at: Utc.timestamp_opt(1, 0).unwrap(),
            received_at: epoch(),
            is_deleted: deleted,
        }
    }

    #[test]
    fn owner_wins_regardless_of_shares() {
        let actor = Uuid::new_v4();
        assert_eq!(Authority::for_list(actor, actor, &[]), Authority::Owner);
    }

    #[test]
    fn accepted_and_refused_shares_grant_invitee() {
        let actor = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let accepted = share(actor, ShareStatus::Accepted, false);
        assert_eq!(
            Authority::for_list(owner, actor, &[accepted]),
            Authority::Invitee
        );

        let refused = share(actor, ShareStatus::Refused, false);
        assert_eq!(
            Authority::for_list(owner, actor, &[refused]),
            Authority::Invitee
        );
    }

    #[test]
    fn pending_or_deleted_shares_grant_nothing() {
        let actor = Uuid::new_v4();
        let owner = Uuid::new_v4();

        let pending = share(actor, ShareStatus::New, false);
        assert_eq!(
            Authority::for_list(owner, actor, &[pending]),
            Authority::None
        );

        let revoked = share(actor, ShareStatus::Accepted, true);
        assert_eq!(
            Authority::for_list(owner, actor, &[revoked]),
            Authority::None
        );

        assert_eq!(Authority::for_list(owner, actor, &[]), Authority::None);
    }

    #[test]
    fn share_authority_splits_by_side() {
        let owner = Uuid::new_v4();
        let invitee = Uuid::new_v4();
        let mut s = share(invitee, ShareStatus::New, false);
        s.owner_id = owner;

        assert_eq!(Authority::for_share(&s, owner), Authority::Owner);
        assert_eq!(Authority::for_share(&s, invitee), Authority::Invitee);
        assert_eq!(Authority::for_share(&s, Uuid::new_v4()), Authority::None);
    }
}
