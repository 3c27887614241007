//! Withdrawal workflow.
//!
//! ```text
//! pending --approve--> approved   (funds stay debited)
//! pending --reject---> rejected   (escrow credited back once)
//! ```
//!
//! Funds leave the real balance when the request is opened, so they cannot
//! be staked while the request is outstanding.

mod desk;
mod errors;

pub use desk::WithdrawalDesk;
pub use errors::{WithdrawalError, WithdrawalResult};
