//! Intent dispatch endpoint.
//!
//! The chat front end turns each button press or message into an
//! [`Intent`] and posts it here with the sender's account id:
//!
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/events \
//!   -H "Authorization: Bearer TOKEN" \
//!   -H "Content-Type: application/json" \
//!   -d '{"account_id": 42, "intent": {"type": "enter_stake", "amount": 100}}'
//! ```
//!
//! Rejections come back as `Reply::Error` with a stable `kind`; only
//! internal failures change the HTTP status.

use super::{AppState, request_id::RequestId};
use crate::{logging, metrics};
use axum::{Json, extract::State, http::StatusCode};
use betsmile::AccountId;
use betsmile::bot::{ErrorKind, Intent, Reply};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub account_id: AccountId,
    pub intent: Intent,
}

/// Dispatch one intent and return the reply to render.
pub async fn post_event(
    State(state): State<AppState>,
    request_id: RequestId,
    Json(event): Json<EventRequest>,
) -> (StatusCode, Json<Reply>) {
    let reply = state.dispatcher.respond(event.account_id, event.intent).await;
    metrics::record_reply(&reply);

    let status = match &reply {
        Reply::WagerSettled { record, .. } => {
            logging::log_ledger_event(
                "wager",
                record.account_id,
                record.net(),
                &format!("{} {} {}", record.variant, record.mode, record.outcome),
            );
            StatusCode::OK
        }
        Reply::Error {
            kind: ErrorKind::Internal,
            ..
        } => {
            tracing::error!(
                request_id = request_id.as_str(),
                account_id = event.account_id,
                "Intent failed internally"
            );
            StatusCode::INTERNAL_SERVER_ERROR
        }
        _ => StatusCode::OK,
    };

    (status, Json(reply))
}
