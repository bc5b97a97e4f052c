//! Competitor-page and product-image analysis handlers

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::Response,
    Json,
};
use copyflow_common::{
    auth::SCOPE_GENERATE,
    content::{ImageAnalysisResult, ImageUpload, Language, UrlAnalysisResult, WritingStyle},
    errors::{AppError, Result},
    metrics::record_generation,
};
use serde::Deserialize;
use std::time::Instant;
use validator::Validate;

use crate::auth::{admit, authenticate, record_outcome, with_rate_limit_headers, ApiClient};
use crate::AppState;

const URL_ENDPOINT: &str = "/v1/analyze/url";
const IMAGE_ENDPOINT: &str = "/v1/analyze/image";

/// Competitor URL analysis payload
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UrlAnalysisRequest {
    #[validate(length(min = 1, message = "URL is required"))]
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub writing_style: String,
    #[serde(default)]
    pub language: String,
}

/// Parse the style/language fields shared by both analysis variants
pub fn parse_style_and_language(style: &str, language: &str) -> Result<(WritingStyle, Language)> {
    let style = WritingStyle::parse(style)
        .ok_or_else(|| AppError::validation("Please select a writing style", Some("writingStyle")))?;
    let language = Language::parse(language)
        .ok_or_else(|| AppError::validation("Please select a language", Some("language")))?;
    Ok((style, language))
}

/// Analyze a competitor product page and generate superior copy
pub async fn analyze_url(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<UrlAnalysisRequest>,
) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;
    client.require_scope(SCOPE_GENERATE, "Insufficient permissions")?;

    if !client.tenant.plan().is_paid() {
        return Err(AppError::Forbidden {
            message: "Pro subscription required for URL analysis".to_string(),
        });
    }

    let decision = admit(&state, &client, URL_ENDPOINT, "POST").await?;

    let outcome = handle_analyze_url(&state, &client, request).await;
    record_outcome(&state, &client, URL_ENDPOINT, "POST", &outcome).await;

    Ok(with_rate_limit_headers(Json(outcome?), decision))
}

async fn handle_analyze_url(
    state: &AppState,
    client: &ApiClient,
    request: UrlAnalysisRequest,
) -> Result<UrlAnalysisResult> {
    request
        .validate()
        .map_err(|e| AppError::validation(e.to_string(), Some("url")))?;
    let (style, language) = parse_style_and_language(&request.writing_style, &request.language)?;

    let fetcher = state
        .fetcher
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable {
            message: "Page fetch service is not configured".to_string(),
        })?;

    let started = Instant::now();
    let result = state
        .engine
        .analyze_competitor(fetcher.as_ref(), &request.url, style, language)
        .await;
    record_generation(started.elapsed().as_secs_f64(), "url", result.is_ok());
    let analysis = result?;

    state
        .repository
        .insert_generation(
            client.tenant.id,
            Some(client.key.id),
            None,
            &analysis.content.product_title,
            "url_analysis",
            style.as_str(),
            language.as_str(),
            serde_json::to_value(&analysis)?,
        )
        .await?;

    Ok(analysis)
}

/// Analyze an uploaded product image and generate copy grounded in it
pub async fn analyze_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;
    client.require_scope(SCOPE_GENERATE, "Insufficient permissions")?;

    if !client.tenant.plan().is_paid() {
        return Err(AppError::Forbidden {
            message: "Pro subscription required for photo analysis".to_string(),
        });
    }

    let decision = admit(&state, &client, IMAGE_ENDPOINT, "POST").await?;

    let outcome = handle_analyze_image(&state, &client, multipart).await;
    record_outcome(&state, &client, IMAGE_ENDPOINT, "POST", &outcome).await;

    Ok(with_rate_limit_headers(Json(outcome?), decision))
}

async fn handle_analyze_image(
    state: &AppState,
    client: &ApiClient,
    mut multipart: Multipart,
) -> Result<ImageAnalysisResult> {
    let mut image: Option<ImageUpload> = None;
    let mut style_field = String::new();
    let mut language_field = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart payload: {}", e), None))?
    {
        match field.name() {
            Some("image") => {
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field.bytes().await.map_err(|e| {
                    AppError::validation(format!("Failed to read image: {}", e), Some("image"))
                })?;
                image = Some(ImageUpload {
                    bytes: bytes.to_vec(),
                    content_type,
                });
            }
            Some("writingStyle") => {
                style_field = field.text().await.unwrap_or_default();
            }
            Some("language") => {
                language_field = field.text().await.unwrap_or_default();
            }
            _ => {}
        }
    }

    let image = image
        .ok_or_else(|| AppError::validation("Image file is required", Some("image")))?;
    let (style, language) = parse_style_and_language(&style_field, &language_field)?;

    let started = Instant::now();
    let result = state.engine.analyze_image(&image, style, language).await;
    record_generation(started.elapsed().as_secs_f64(), "image", result.is_ok());
    let analysis = result?;

    state
        .repository
        .insert_generation(
            client.tenant.id,
            Some(client.key.id),
            None,
            &analysis.content.product_title,
            "photo_analysis",
            style.as_str(),
            language.as_str(),
            serde_json::to_value(&analysis)?,
        )
        .await?;

    Ok(analysis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_style_and_language() {
        let (style, language) = parse_style_and_language("luxury", "fr").unwrap();
        assert_eq!(style, WritingStyle::Luxury);
        assert_eq!(language, Language::Fr);
    }

    #[test]
    fn test_unknown_style_rejected() {
        let err = parse_style_and_language("breezy", "en").unwrap_err();
        assert_eq!(err.to_string(), "Please select a writing style");
    }

    #[test]
    fn test_unknown_language_rejected() {
        let err = parse_style_and_language("casual", "xx").unwrap_err();
        assert_eq!(err.to_string(), "Please select a language");
    }
}
