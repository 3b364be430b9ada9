//! Shoply: sync backend for a multi-device, offline-first shared
//! shopping-list application.
//!
//! Devices push batches of locally-made mutations (lists, items, sharing
//! invitations, favorite products) and pull everything that changed since
//! their last watermark. The core is the reconciliation engine in
//! [`sync`]: a per-entity conflict-resolution pass under a shared
//! ownership model, with idempotent replay semantics and
//! exactly-once-per-transaction event emission.

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod notify;
pub mod server;
pub mod sync;

pub use error::SyncError;
