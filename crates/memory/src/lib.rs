//! Conversation memory for QuotaRelay.
//!
//! - [`SessionStore`]: bounded, auto-expiring per-user turn windows (in memory)
//! - [`Repository`]: shared long-term notes persisted as JSON

pub mod repository;
pub mod session;

pub use repository::{ContextEntry, Repository, RepositoryError};
pub use session::SessionStore;
