//! Repositories: owners of one entity collection each.
//!
//! A repository holds the in-memory collection, maintains its invariants,
//! and persists through the storage contract. Every mutation is
//! persist-before-apply: the next collection is built, written to storage,
//! and only committed to memory once the write succeeds, so a storage
//! failure never leaves memory ahead of durable state.

pub mod contexts;
pub mod settings;
pub mod tasks;
pub mod views;

pub use contexts::ContextRepository;
pub use settings::SettingsRepository;
pub use tasks::TaskRepository;
pub use views::ViewRepository;
