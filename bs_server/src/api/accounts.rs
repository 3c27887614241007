//! Read-only account views for the front end.

use super::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use betsmile::AccountId;
use betsmile::ledger::{Account, LedgerEntry, LedgerError, WagerRecord};
use serde::{Deserialize, Serialize};

const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

impl ListQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

fn error_response(e: LedgerError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        LedgerError::AccountNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Timeout(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => {
            tracing::error!("Account view failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: e.client_message(),
        }),
    )
}

/// `GET /api/v1/accounts/{id}`
pub async fn get_account(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
) -> ApiResult<Account> {
    state
        .accounts
        .get_account(account_id)
        .await
        .map(Json)
        .map_err(error_response)
}

/// `GET /api/v1/accounts/{id}/wagers?limit=N`, newest first
pub async fn list_wagers(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<WagerRecord>> {
    // Unknown accounts are a 404, not an empty list
    state
        .accounts
        .get_account(account_id)
        .await
        .map_err(error_response)?;
    state
        .accounts
        .wagers(account_id, query.limit())
        .await
        .map(Json)
        .map_err(error_response)
}

/// `GET /api/v1/accounts/{id}/entries?limit=N`, newest first
pub async fn list_entries(
    State(state): State<AppState>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<LedgerEntry>> {
    state
        .accounts
        .get_account(account_id)
        .await
        .map_err(error_response)?;
    state
        .accounts
        .entries(account_id, query.limit())
        .await
        .map(Json)
        .map_err(error_response)
}
