use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{BuyWagerRequest, CreateWagerRequest, Purchase, Wager};
use crate::validation;
use crate::AppState;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// Pagination parameters, kept as raw strings so parse failures produce the
/// fixed error messages instead of a generic rejection.
#[derive(Deserialize)]
pub struct ListQuery {
    page: Option<String>,
    limit: Option<String>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /wagers — list a wager for sale
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateWagerRequest>,
) -> Result<(StatusCode, Json<Wager>), AppError> {
    let violations = validation::validate_create_wager(&body);
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }
    if let Some(message) = validation::validate_placement_price(&body) {
        return Err(AppError::Validation(vec![message]));
    }

    let wager = state.service.create_wager(body).await?;
    Ok((StatusCode::CREATED, Json(wager)))
}

/// GET /wagers — page through listed wagers
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Wager>>, AppError> {
    let page = match query.page {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest("failed to parse page number".into()))?,
        None => DEFAULT_PAGE,
    };
    let limit = match query.limit {
        Some(raw) => raw
            .parse::<i64>()
            .map_err(|_| AppError::BadRequest("failed to parse limit number".into()))?,
        None => DEFAULT_LIMIT,
    };

    let violations = validation::validate_listing_query(page, limit);
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    let wagers = state.service.list_wagers(page, limit).await?;
    Ok(Json(wagers))
}

/// POST /buy/{wager_id} — buy a fraction of a wager
pub async fn buy(
    State(state): State<AppState>,
    Path(wager_id): Path<String>,
    Json(body): Json<BuyWagerRequest>,
) -> Result<(StatusCode, Json<Purchase>), AppError> {
    let wager_id = wager_id
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("failed to parse wager id".into()))?;

    let violations = validation::validate_buy_wager(wager_id, &body);
    if !violations.is_empty() {
        return Err(AppError::Validation(violations));
    }

    let purchase = state.service.buy_wager(wager_id, body.buying_price).await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}
