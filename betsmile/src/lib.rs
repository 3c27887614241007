//! # BetSmile
//!
//! Ledger and game core for a chat bot that runs chance-based mini-games over
//! per-account demo and real balances.
//!
//! Every balance mutation goes through a [`ledger`] store which serializes
//! updates per account and appends an audit entry for each one. The other
//! components only request mutations:
//!
//! - [`wager`]: resolves a round (warm-up wins, streak cap, random draw) and
//!   settles it atomically against the account
//! - [`payments`]: creates invoices with the payment provider and credits
//!   paid ones exactly once
//! - [`withdrawal`]: escrows funds on request and resolves them on an admin
//!   decision
//! - [`admin`] and [`support`]: privileged operations and support tickets
//! - [`bot`]: the intent contract used by the chat front end
//!
//! ## Example
//!
//! ```
//! use betsmile::ledger::{AccountStore, MemoryStore};
//! use betsmile::settings::{GameSettings, SettingsHandle};
//! use betsmile::wager::{GameVariant, Pick, WagerEngine};
//! use betsmile::Mode;
//! use std::sync::Arc;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(MemoryStore::new());
//! let settings = SettingsHandle::new(GameSettings::default());
//! store.open_account(7, Some("alice"), &settings.snapshot().await.account_defaults()).await?;
//!
//! let engine = WagerEngine::new(store.clone(), settings);
//! let receipt = engine
//!     .place_wager(7, GameVariant::CoinFlip, 100, Mode::Demo, Pick::Coin(betsmile::wager::CoinSide::Heads))
//!     .await?;
//! println!("{:?} -> demo balance {}", receipt.record.outcome, receipt.account.balances.demo);
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod bot;
pub mod db;
pub mod ledger;
pub mod money;
pub mod notify;
pub mod payments;
pub mod settings;
pub mod support;
pub mod wager;
pub mod withdrawal;

pub use ledger::{AccountId, Balances, Mode};
pub use money::{Cents, Multiplier};
