//! Entity models shared by the sync engine, the repositories and the
//! HTTP boundary.
//!
//! Every syncable entity carries client-set `created_at`/`updated_at`
//! timestamps plus a server-assigned `received_at` used as the pull
//! watermark. Timestamps travel over the wire as unix seconds.

mod item;
mod list;
mod notification;
mod share;
mod user;
mod user_product;

pub use item::ListItem;
pub use list::List;
pub use notification::{Notification, NotificationKind};
pub use share::{ListShare, ShareStatus};
pub use user::{ExternalUser, User, UserProjection};
pub use user_product::UserProduct;

use chrono::{DateTime, Utc};

/// Serde default for `received_at`: clients never set it, the server
/// overwrites it at ingestion time.
pub(crate) fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

pub(crate) fn is_zero_timestamp(ts: &DateTime<Utc>) -> bool {
    ts.timestamp() == 0
}
