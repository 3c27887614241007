//! Conversational contract with the chat front end.
//!
//! The front end turns button presses and messages into [`Intent`]s and
//! renders the [`Reply`] it gets back. In-progress selections live in an
//! explicit [`PlayContext`] per account, not in the chat framework.

mod dispatcher;
mod errors;
mod intents;
mod session;

pub use dispatcher::{DEFAULT_HISTORY_LIMIT, Dispatcher};
pub use errors::{BotError, BotResult, ErrorKind};
pub use intents::{AdminIntent, Intent, Reply};
pub use session::{PlayContext, SessionRegistry};
