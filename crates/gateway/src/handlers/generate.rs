//! Single-item generation handlers

use axum::{extract::State, http::HeaderMap, response::Response, Json};
use copyflow_common::{
    auth::SCOPE_GENERATE,
    content::{GenerationRequest, ProductCopy, RawGenerationItem, ViralContent},
    errors::{AppError, Result},
    metrics::record_generation,
};
use std::time::Instant;

use crate::auth::{admit, authenticate, record_outcome, with_rate_limit_headers, ApiClient};
use crate::AppState;

const GENERATE_ENDPOINT: &str = "/v1/generate";
const VIRAL_ENDPOINT: &str = "/v1/generate/viral";

/// Generate product copy for one item
pub async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(raw): Json<RawGenerationItem>,
) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;
    client.require_scope(SCOPE_GENERATE, "Insufficient permissions")?;
    let decision = admit(&state, &client, GENERATE_ENDPOINT, "POST").await?;

    let outcome = handle_generate(&state, &client, raw).await;
    record_outcome(&state, &client, GENERATE_ENDPOINT, "POST", &outcome).await;

    Ok(with_rate_limit_headers(Json(outcome?), decision))
}

async fn handle_generate(
    state: &AppState,
    client: &ApiClient,
    raw: RawGenerationItem,
) -> Result<ProductCopy> {
    let request = GenerationRequest::validate(&raw)?;

    let started = Instant::now();
    let result = state.engine.generate(&request).await;
    record_generation(started.elapsed().as_secs_f64(), "standard", result.is_ok());
    let copy = result?;

    state
        .repository
        .insert_generation(
            client.tenant.id,
            Some(client.key.id),
            None,
            &request.product_name,
            request.category.as_str(),
            request.writing_style.as_str(),
            request.language.as_str(),
            serde_json::to_value(&copy)?,
        )
        .await?;

    Ok(copy)
}

/// Generate viral social content for one item
pub async fn generate_viral(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(raw): Json<RawGenerationItem>,
) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;
    client.require_scope(SCOPE_GENERATE, "Insufficient permissions")?;

    if !client.tenant.plan().allows_bulk() {
        return Err(AppError::Forbidden {
            message: "Business subscription required for viral content generation".to_string(),
        });
    }

    let decision = admit(&state, &client, VIRAL_ENDPOINT, "POST").await?;

    let outcome = handle_generate_viral(&state, &client, raw).await;
    record_outcome(&state, &client, VIRAL_ENDPOINT, "POST", &outcome).await;

    Ok(with_rate_limit_headers(Json(outcome?), decision))
}

async fn handle_generate_viral(
    state: &AppState,
    client: &ApiClient,
    raw: RawGenerationItem,
) -> Result<ViralContent> {
    let request = GenerationRequest::validate(&raw)?;

    let started = Instant::now();
    let result = state.engine.generate_viral(&request).await;
    record_generation(started.elapsed().as_secs_f64(), "viral", result.is_ok());
    let viral = result?;

    let mut content = serde_json::to_value(&viral)?;
    if let Some(object) = content.as_object_mut() {
        object.insert("type".to_string(), serde_json::json!("viral"));
    }

    state
        .repository
        .insert_generation(
            client.tenant.id,
            Some(client.key.id),
            None,
            &request.product_name,
            request.category.as_str(),
            request.writing_style.as_str(),
            request.language.as_str(),
            content,
        )
        .await?;

    Ok(viral)
}
