//! Usage analytics handler

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use copyflow_common::{auth::SCOPE_USAGE, errors::Result, usage::Period};
use serde::Deserialize;

use crate::auth::{authenticate, record_outcome};
use crate::AppState;

const USAGE_ENDPOINT: &str = "/v1/usage";

#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    pub period: Option<String>,
}

/// Usage analytics for the calling credential over a period
pub async fn report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<UsageQuery>,
) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;
    client.require_scope(SCOPE_USAGE, "Insufficient permissions")?;

    let period = Period::parse(query.period.as_deref());
    let outcome = state.ledger.report(client.key.id, period).await;
    record_outcome(&state, &client, USAGE_ENDPOINT, "GET", &outcome).await;

    Ok(Json(outcome?).into_response())
}
