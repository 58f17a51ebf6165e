//! Currency and rate graph routes.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use crate::{
    AppState,
    middleware::{AuthUser, require_role},
};
use fxgate_core::rates::convert_amount;
use fxgate_db::repositories::{CurrencyError, CurrencyRepository};
use fxgate_db::entities::currencies;
use fxgate_shared::Role;

/// Creates the currency routes (requires auth middleware to be applied
/// externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/currencies", get(list_currencies))
        .route("/currencies", post(create_currency))
        .route("/currencies", delete(delete_currency))
        .route("/currencies/rate", put(set_rate))
        .route("/currencies/rate", delete(delete_rate))
        .route("/currencies/convert", post(convert))
}

/// Request body for creating a currency.
#[derive(Debug, Deserialize)]
pub struct CreateCurrencyRequest {
    /// Currency symbol (case-sensitive, opaque).
    pub symbol: String,
    /// Human-readable name.
    pub name: String,
}

/// Request body for deleting a currency.
#[derive(Debug, Deserialize)]
pub struct DeleteCurrencyRequest {
    /// Currency symbol.
    pub symbol: String,
}

/// Request body for setting a rate pair.
#[derive(Debug, Deserialize)]
pub struct SetRateRequest {
    /// Base currency symbol.
    pub base: String,
    /// Target currency symbol.
    pub target: String,
    /// Rate: 1 base = rate target.
    pub rate: Decimal,
}

/// Request body for deleting a rate pair.
#[derive(Debug, Deserialize)]
pub struct DeleteRateRequest {
    /// Base currency symbol.
    pub base: String,
    /// Target currency symbol.
    pub target: String,
}

/// Request body for a conversion.
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Base currency symbol.
    pub base: String,
    /// Target currency symbol.
    pub target: String,
    /// Amount of base currency to convert.
    pub amount: Decimal,
}

/// Response for a currency.
#[derive(Debug, Serialize)]
pub struct CurrencyResponse {
    /// Currency symbol.
    pub symbol: String,
    /// Human-readable name.
    pub name: String,
    /// Direct rate edges, target symbol -> rate.
    pub rates: currencies::RateMap,
}

impl From<currencies::Model> for CurrencyResponse {
    fn from(model: currencies::Model) -> Self {
        Self {
            symbol: model.symbol,
            name: model.name,
            rates: model.rates,
        }
    }
}

/// GET /currencies - List all currencies with their rates.
async fn list_currencies(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(response) = require_role(&auth, Role::Viewer) {
        return response;
    }

    let repo = CurrencyRepository::new((*state.db).clone());

    match repo.list().await {
        Ok(list) => {
            let currencies: Vec<CurrencyResponse> =
                list.into_iter().map(CurrencyResponse::from).collect();
            (
                StatusCode::OK,
                Json(json!({
                    "count": currencies.len(),
                    "currencies": currencies
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to list currencies");
            internal_error()
        }
    }
}

/// POST /currencies - Create a currency.
async fn create_currency(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateCurrencyRequest>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&auth, Role::Editor) {
        return response;
    }

    if payload.symbol.is_empty() || payload.name.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_currency",
                "message": "Symbol and name must not be empty"
            })),
        )
            .into_response();
    }

    let repo = CurrencyRepository::new((*state.db).clone());

    match repo.create(&payload.symbol, &payload.name).await {
        Ok(created) => {
            info!(symbol = %created.symbol, "Currency created");
            (StatusCode::CREATED, Json(CurrencyResponse::from(created))).into_response()
        }
        Err(CurrencyError::AlreadyExists(symbol)) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": "currency_exists",
                "message": format!("Currency '{symbol}' already exists")
            })),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Failed to create currency");
            internal_error()
        }
    }
}

/// DELETE /currencies - Delete a currency and every edge pointing at it.
async fn delete_currency(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<DeleteCurrencyRequest>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&auth, Role::Editor) {
        return response;
    }

    let repo = CurrencyRepository::new((*state.db).clone());

    match repo.delete(&payload.symbol).await {
        Ok(()) => {
            info!(symbol = %payload.symbol, "Currency deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(CurrencyError::CurrencyNotFound(symbol)) => currency_not_found(&symbol),
        Err(e) => {
            error!(error = %e, "Failed to delete currency");
            internal_error()
        }
    }
}

/// PUT /currencies/rate - Set both directions of a rate pair.
async fn set_rate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<SetRateRequest>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&auth, Role::Editor) {
        return response;
    }

    let repo = CurrencyRepository::new((*state.db).clone());

    match repo
        .set_rate(&payload.base, &payload.target, payload.rate)
        .await
    {
        Ok(()) => {
            info!(
                base = %payload.base,
                target = %payload.target,
                rate = %payload.rate,
                "Rate pair set"
            );
            (
                StatusCode::CREATED,
                Json(json!({
                    "base": payload.base,
                    "target": payload.target,
                    "rate": payload.rate
                })),
            )
                .into_response()
        }
        Err(CurrencyError::SameCurrency) => same_currency(),
        Err(CurrencyError::NonPositiveRate) => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_rate",
                "message": "Rate must be positive"
            })),
        )
            .into_response(),
        Err(CurrencyError::CurrencyNotFound(symbol)) => currency_not_found(&symbol),
        Err(e) => {
            error!(error = %e, "Failed to set rate");
            internal_error()
        }
    }
}

/// DELETE /currencies/rate - Remove both directions of a rate pair.
async fn delete_rate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<DeleteRateRequest>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&auth, Role::Editor) {
        return response;
    }

    let repo = CurrencyRepository::new((*state.db).clone());

    match repo.delete_rate(&payload.base, &payload.target).await {
        Ok(()) => {
            info!(base = %payload.base, target = %payload.target, "Rate pair deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(CurrencyError::SameCurrency) => same_currency(),
        Err(CurrencyError::CurrencyNotFound(symbol)) => currency_not_found(&symbol),
        Err(CurrencyError::RateNotFound(base, target)) => rate_not_found(&base, &target),
        Err(e) => {
            error!(error = %e, "Failed to delete rate");
            internal_error()
        }
    }
}

/// POST /currencies/convert - Convert an amount over a direct edge.
async fn convert(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<ConvertRequest>,
) -> impl IntoResponse {
    if let Err(response) = require_role(&auth, Role::Viewer) {
        return response;
    }

    let repo = CurrencyRepository::new((*state.db).clone());

    match repo.get_rate(&payload.base, &payload.target).await {
        Ok(rate) => {
            let converted_amount = convert_amount(payload.amount, rate);
            (
                StatusCode::OK,
                Json(json!({
                    "base": payload.base,
                    "target": payload.target,
                    "amount": payload.amount,
                    "converted_amount": converted_amount
                })),
            )
                .into_response()
        }
        Err(CurrencyError::CurrencyNotFound(symbol)) => currency_not_found(&symbol),
        Err(CurrencyError::RateNotFound(base, target)) => rate_not_found(&base, &target),
        Err(e) => {
            error!(error = %e, "Failed to convert");
            internal_error()
        }
    }
}

// Shared error responses

fn currency_not_found(symbol: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "currency_not_found",
            "message": format!("Currency '{symbol}' not found")
        })),
    )
        .into_response()
}

fn rate_not_found(base: &str, target: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "rate_not_found",
            "message": format!("No rate from '{base}' to '{target}'")
        })),
    )
        .into_response()
}

fn same_currency() -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": "same_currency",
            "message": "Base and target must be different"
        })),
    )
        .into_response()
}

fn internal_error() -> axum::response::Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": "internal_error",
            "message": "An error occurred"
        })),
    )
        .into_response()
}
