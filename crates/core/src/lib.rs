//! # QuotaRelay Core
//!
//! Domain types, traits, and error definitions for the QuotaRelay chat relay.
//! This crate has **zero framework dependencies**: it defines the domain model
//! that the ledger, session store, providers, and relay implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator at a seam is a trait here (`Provider`, `Clock`).
//! Implementations live in their respective crates, so tests can swap in
//! scripted providers and manual clocks.

pub mod clock;
pub mod error;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ProviderError;
pub use message::{Message, Role, Turn, UserId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
