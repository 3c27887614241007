//! Wager engine: decides rounds and settles them against the ledger.
//!
//! Whether a round wins is decided first, from the warm-up counter, the
//! streak cap and a uniform draw against the configured win chance. The
//! player's pick only shapes the [`Reveal`]: a win shows a value matching
//! the pick, a loss shows one that does not.

mod engine;
mod errors;
mod variants;

pub use engine::{WagerEngine, WagerReceipt};
pub use errors::{WagerError, WagerResult};
pub use variants::{CoinSide, ForcedBy, GameVariant, Outcome, Pick, Reveal};
