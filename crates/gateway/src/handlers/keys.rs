//! API key management handlers
//!
//! The raw token is returned exactly once, on creation. Listings carry
//! only the masked prefix.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use copyflow_common::{
    auth::{mask_token, ScopeSet, SCOPE_KEYS},
    db::models::ApiKey,
    errors::{AppError, Result},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{authenticate, record_outcome};
use crate::AppState;

const KEYS_ENDPOINT: &str = "/v1/keys";

/// One key in a listing, token masked
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyListEntry {
    pub id: Uuid,
    pub name: String,
    pub key: String,
    pub scopes: Vec<String>,
    pub usage_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<String>,
    pub is_active: bool,
    pub created_at: String,
}

/// Project a stored key into its masked listing shape
pub fn list_entry(key: &ApiKey) -> KeyListEntry {
    KeyListEntry {
        id: key.id,
        name: key.name.clone(),
        key: mask_token(&key.token_prefix),
        scopes: key.scopes.0.clone(),
        usage_count: key.usage_count,
        last_used: key.last_used_at.map(|dt| dt.to_rfc3339()),
        is_active: key.is_active,
        created_at: key.created_at.to_rfc3339(),
    }
}

/// List the tenant's API keys
pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;
    client.require_scope(SCOPE_KEYS, "Insufficient permissions")?;

    let outcome = state
        .repository
        .list_api_keys(client.tenant.id)
        .await
        .map(|keys| keys.iter().map(list_entry).collect::<Vec<_>>());
    record_outcome(&state, &client, KEYS_ENDPOINT, "GET", &outcome).await;

    Ok(Json(outcome?).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CreateKeyRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyResponse {
    pub id: Uuid,
    pub name: String,
    /// The raw token; shown here and never again
    pub key: String,
    pub scopes: Vec<String>,
    pub created_at: String,
}

/// Validate a key-creation payload
pub fn validate_create_request(request: &CreateKeyRequest) -> Result<()> {
    if request.name.trim().is_empty() {
        return Err(AppError::validation("Key name is required", Some("name")));
    }
    if request.permissions.is_empty() {
        return Err(AppError::validation(
            "At least one permission is required",
            Some("permissions"),
        ));
    }
    Ok(())
}

/// Create a new API key for the tenant
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateKeyRequest>,
) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;
    client.require_scope(SCOPE_KEYS, "Insufficient permissions")?;

    let outcome = handle_create(&state, &client, request).await;
    record_outcome(&state, &client, KEYS_ENDPOINT, "POST", &outcome).await;

    Ok((StatusCode::CREATED, Json(outcome?)).into_response())
}

async fn handle_create(
    state: &AppState,
    client: &crate::auth::ApiClient,
    request: CreateKeyRequest,
) -> Result<CreateKeyResponse> {
    validate_create_request(&request)?;

    let (key, raw_token) = state
        .repository
        .create_api_key(
            client.tenant.id,
            request.name,
            ScopeSet::new(request.permissions),
        )
        .await?;

    tracing::info!(
        api_key_id = %key.id,
        tenant_id = %client.tenant.id,
        "API key created"
    );

    Ok(CreateKeyResponse {
        id: key.id,
        name: key.name,
        key: raw_token,
        scopes: key.scopes.0,
        created_at: key.created_at.to_rfc3339(),
    })
}

/// Soft-deactivate an API key
pub async fn deactivate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key_id): Path<Uuid>,
) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;
    client.require_scope(SCOPE_KEYS, "Insufficient permissions")?;

    let outcome = match state
        .repository
        .deactivate_api_key(key_id, client.tenant.id)
        .await
    {
        Ok(true) => Ok(()),
        Ok(false) => Err(AppError::KeyNotFound {
            id: key_id.to_string(),
        }),
        Err(e) => Err(e),
    };
    record_outcome(&state, &client, KEYS_ENDPOINT, "DELETE", &outcome).await;
    outcome?;

    tracing::info!(api_key_id = %key_id, tenant_id = %client.tenant.id, "API key deactivated");

    Ok(StatusCode::NO_CONTENT.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_create_request_validation() {
        assert!(validate_create_request(&CreateKeyRequest {
            name: "ci".to_string(),
            permissions: vec!["content:generate".to_string()],
        })
        .is_ok());

        assert!(validate_create_request(&CreateKeyRequest {
            name: String::new(),
            permissions: vec!["*".to_string()],
        })
        .is_err());

        assert!(validate_create_request(&CreateKeyRequest {
            name: "ci".to_string(),
            permissions: vec![],
        })
        .is_err());
    }

    #[test]
    fn test_listing_masks_token() {
        let key = ApiKey {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "ci".to_string(),
            token_hash: "deadbeef".to_string(),
            token_prefix: "cf_3fa9c".to_string(),
            scopes: ScopeSet::new(vec!["*".to_string()]),
            usage_count: 7,
            last_used_at: None,
            is_active: true,
            created_at: Utc::now().into(),
        };

        let entry = list_entry(&key);
        assert_eq!(entry.key, "cf_3fa9c...");
        assert!(!entry.key.contains("deadbeef"));
        assert_eq!(entry.usage_count, 7);
    }
}
