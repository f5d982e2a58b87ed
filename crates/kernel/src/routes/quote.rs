//! Quote CRUD route handlers.
//!
//! List and show run through the query-builder service, so callers get
//! filtering, sorting, includes, and pagination from the query string.
//! Mutations validate referenced records and carry the API token guard.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Category, CreateQuote, Quote, Quotee};
use crate::query::ParamMap;
use crate::state::AppState;

/// Error response for quote operations.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Request body for creating or replacing a quote.
#[derive(Debug, Deserialize)]
pub struct QuoteRequest {
    pub quote_content: String,
    pub quotee_id: Uuid,
    pub category_id: Uuid,
    pub keywords: Option<String>,
}

type ErrorReply = (StatusCode, Json<ErrorResponse>);

fn error_reply(status: StatusCode, message: &str) -> ErrorReply {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn internal_error(error: anyhow::Error, context: &str) -> ErrorReply {
    tracing::error!(error = %error, "{context}");
    error_reply(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
}

/// List quotes with filtering, sorting, includes, and pagination.
///
/// GET /api/quotes
async fn list_quotes(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<serde_json::Value>>, ErrorReply> {
    let params = ParamMap::from_pairs(pairs);

    let quotes = state
        .quotes()
        .get_quotes(&params)
        .await
        .map_err(|e| internal_error(e, "failed to list quotes"))?;

    if quotes.is_empty() {
        return Err(error_reply(
            StatusCode::NOT_FOUND,
            "No quotes found with the given criteria",
        ));
    }

    Ok(Json(quotes))
}

/// Show a single quote through the same query pipeline, so includes still
/// apply.
///
/// GET /api/quotes/{id}
async fn get_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<serde_json::Value>, ErrorReply> {
    let mut params = ParamMap::from_pairs(pairs);
    params.insert("id", id.to_string());

    let mut quotes = state
        .quotes()
        .get_quotes(&params)
        .await
        .map_err(|e| internal_error(e, "failed to load quote"))?;

    let Some(quote) = quotes.pop() else {
        return Err(error_reply(StatusCode::NOT_FOUND, "Quote not found"));
    };

    Ok(Json(quote))
}

/// Shared mutation validation: content present, referenced records exist.
async fn validate_quote_request(
    state: &AppState,
    request: &QuoteRequest,
) -> Result<(), ErrorReply> {
    if request.quote_content.trim().is_empty() {
        return Err(error_reply(
            StatusCode::BAD_REQUEST,
            "quote_content is required",
        ));
    }

    let quotee = Quotee::find_by_id(state.db(), request.quotee_id)
        .await
        .map_err(|e| internal_error(e, "failed to load quotee"))?;
    if quotee.is_none() {
        return Err(error_reply(
            StatusCode::BAD_REQUEST,
            "quotee_id does not reference a known quotee",
        ));
    }

    let category = Category::find_by_id(state.db(), request.category_id)
        .await
        .map_err(|e| internal_error(e, "failed to load category"))?;
    if category.is_none() {
        return Err(error_reply(
            StatusCode::BAD_REQUEST,
            "category_id does not reference a known category",
        ));
    }

    Ok(())
}

/// Create a quote.
///
/// POST /api/quotes
async fn create_quote(
    State(state): State<AppState>,
    Json(request): Json<QuoteRequest>,
) -> Result<(StatusCode, Json<Quote>), ErrorReply> {
    validate_quote_request(&state, &request).await?;

    let input = CreateQuote {
        quote_content: request.quote_content,
        quotee_id: request.quotee_id,
        category_id: request.category_id,
        keywords: request.keywords,
    };

    let quote = Quote::create(state.db(), input)
        .await
        .map_err(|e| internal_error(e, "failed to create quote"))?;

    Ok((StatusCode::CREATED, Json(quote)))
}

/// Replace a quote.
///
/// PUT /api/quotes/{id}
async fn update_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>, ErrorReply> {
    validate_quote_request(&state, &request).await?;

    let input = CreateQuote {
        quote_content: request.quote_content,
        quotee_id: request.quotee_id,
        category_id: request.category_id,
        keywords: request.keywords,
    };

    let quote = Quote::update(state.db(), id, input)
        .await
        .map_err(|e| internal_error(e, "failed to update quote"))?
        .ok_or_else(|| error_reply(StatusCode::NOT_FOUND, "Quote not found"))?;

    Ok(Json(quote))
}

/// Delete a quote.
///
/// DELETE /api/quotes/{id}
async fn delete_quote(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ErrorReply> {
    let deleted = Quote::delete(state.db(), id)
        .await
        .map_err(|e| internal_error(e, "failed to delete quote"))?;

    if !deleted {
        return Err(error_reply(StatusCode::NOT_FOUND, "Quote not found"));
    }

    Ok(Json(serde_json::json!({"deleted": true})))
}

/// Create the quote router. Mutating routes carry the API token guard;
/// reads stay open.
pub fn router(state: &AppState) -> Router<AppState> {
    let require_token = axum::middleware::from_fn_with_state(
        state.clone(),
        crate::middleware::require_api_token,
    );

    Router::new()
        .route("/api/quotes", get(list_quotes))
        .route("/api/quotes/{id}", get(get_quote))
        .route(
            "/api/quotes",
            post(create_quote).route_layer(require_token.clone()),
        )
        .route(
            "/api/quotes/{id}",
            put(update_quote)
                .delete(delete_quote)
                .route_layer(require_token),
        )
}
