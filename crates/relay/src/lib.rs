//! Request orchestration for QuotaRelay.
//!
//! A turn goes through:
//!
//! 1. **Policy**: the day's usage picks the model, adds a warning, or refuses
//! 2. **Context**: system identity, repository notes, session history, prompt
//! 3. **Provider call**: one attempt, bounded by a timeout
//! 4. **Accounting**: on a usable reply, the session and the ledger are updated
//!
//! Refusals and failures leave both the session and the ledger untouched.

pub mod outcome;
pub mod prompt;
pub mod relay;

#[cfg(test)]
mod test_helpers;

pub use outcome::{Failure, Refusal, TurnError, TurnReply};
pub use prompt::DEFAULT_SYSTEM_PROMPT;
pub use relay::{PROMPT_LOG_TARGET, Relay};
