//! The reconciliation core.
//!
//! A push is one [`UpdaterManager::run_update`] call: one transaction, the
//! updaters running strictly in order (users, lists, shares, items, user
//! products), events buffered in an [`EventCollection`] and published only
//! after commit. A pull is one [`Receiver::get_updates`] call aggregating
//! everything that changed for a user since a watermark.

mod access;
mod event_collection;
mod items_updater;
mod lists_collection;
mod lists_updater;
mod pack;
mod receiver;
mod shares_updater;
mod updater_manager;
mod user_products_updater;

pub use access::Authority;
pub use event_collection::EventCollection;
pub use items_updater::ItemsUpdater;
pub use lists_collection::ListsCollection;
pub use lists_updater::ListsUpdater;
pub use pack::{SyncBatch, UpdatesPack};
pub use receiver::Receiver;
pub use shares_updater::SharesUpdater;
pub use updater_manager::UpdaterManager;
pub use user_products_updater::UserProductsUpdater;
