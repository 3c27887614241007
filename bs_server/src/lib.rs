//! HTTP front for the betsmile ledger: intent dispatch, account views,
//! configuration, logging and metrics.

pub mod api;
pub mod config;
pub mod logging;
pub mod metrics;
