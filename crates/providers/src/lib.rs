//! Completion provider implementations for QuotaRelay.
//!
//! All providers implement the `quotarelay_core::Provider` trait.
//! `build_from_config` wires the configured backend.

pub mod openai_compat;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, default_base_url};
