//! Request authentication and admission for the programmatic API
//!
//! Every `/v1` handler runs the same sequence the source contract
//! specifies: resolve the bearer credential, check the permission scope,
//! run the per-credential admission check, do the work, then append the
//! outcome to the usage ledger. Auth failures (401) happen before a
//! credential is known and are therefore not attributable to one.

use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue};
use axum::response::{IntoResponse, Response};
use copyflow_common::{
    auth::{extract_bearer, hash_api_key},
    db::models::{ApiKey, Tenant},
    errors::{AppError, Result},
    ratelimit::RateLimitDecision,
};

use crate::AppState;

/// The resolved caller of a programmatic request
#[derive(Debug, Clone)]
pub struct ApiClient {
    pub key: ApiKey,
    pub tenant: Tenant,
}

impl ApiClient {
    /// Require a permission scope, with the message the client sees on 403
    pub fn require_scope(&self, scope: &str, denial_message: &str) -> Result<()> {
        if self.key.has_scope(scope) {
            Ok(())
        } else {
            Err(AppError::Forbidden {
                message: denial_message.to_string(),
            })
        }
    }
}

/// Resolve the bearer token to an active credential and its tenant.
///
/// Absent, unknown, or inactive tokens are all the same 401 to the caller.
/// The usage-counter bump is best-effort: a failure to record it must not
/// fail the request.
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<ApiClient> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(extract_bearer)
        .ok_or(AppError::InvalidApiKey)?;

    let key = state
        .repository
        .find_api_key_by_hash(&hash_api_key(token))
        .await?
        .ok_or(AppError::InvalidApiKey)?;

    if let Err(e) = state.repository.record_api_key_use(key.id).await {
        tracing::warn!(error = %e, api_key_id = %key.id, "Failed to record credential use");
    }

    let tenant = state
        .repository
        .find_tenant_by_id(key.tenant_id)
        .await?
        .ok_or_else(|| AppError::TenantNotFound {
            id: key.tenant_id.to_string(),
        })?;

    Ok(ApiClient { key, tenant })
}

/// Run the per-credential admission check for a metered endpoint.
///
/// A rejection is itself appended to the usage ledger with status 429
/// before the 429 response is returned; the rejected call does not consume
/// admission quota in the window that rejected it.
pub async fn admit(
    state: &AppState,
    client: &ApiClient,
    endpoint: &str,
    method: &str,
) -> Result<RateLimitDecision> {
    let decision = state
        .limiter
        .admit(client.key.id, client.tenant.plan())
        .await?;

    if !decision.admitted {
        state
            .ledger
            .record(client.key.id, client.tenant.id, endpoint, method, 429)
            .await;

        return Err(AppError::RateLimited {
            limit: decision.limit,
            remaining: decision.remaining,
            reset_epoch: decision.reset_epoch,
        });
    }

    Ok(decision)
}

/// Append the final outcome of a handled request to the usage ledger
pub async fn record_outcome<T>(
    state: &AppState,
    client: &ApiClient,
    endpoint: &str,
    method: &str,
    outcome: &Result<T>,
) {
    let status = match outcome {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16() as i32,
    };

    state
        .ledger
        .record(client.key.id, client.tenant.id, endpoint, method, status)
        .await;
}

/// Attach the rate-limit headers to a successful response
pub fn with_rate_limit_headers(response: impl IntoResponse, decision: RateLimitDecision) -> Response {
    let mut response = response.into_response();
    let headers = response.headers_mut();

    for (name, value) in decision.headers() {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(name, value);
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use chrono::Utc;
    use copyflow_common::auth::ScopeSet;
    use uuid::Uuid;

    fn client_with_scopes(scopes: Vec<&str>) -> ApiClient {
        let now = Utc::now();
        ApiClient {
            key: ApiKey {
                id: Uuid::new_v4(),
                tenant_id: Uuid::new_v4(),
                name: "test".to_string(),
                token_hash: "hash".to_string(),
                token_prefix: "cf_abcde".to_string(),
                scopes: ScopeSet::new(scopes.into_iter().map(String::from).collect()),
                usage_count: 0,
                last_used_at: None,
                is_active: true,
                created_at: now.into(),
            },
            tenant: Tenant {
                id: Uuid::new_v4(),
                name: "acme".to_string(),
                plan: "business".to_string(),
                owner_email: "owner@acme.test".to_string(),
                is_active: true,
                created_at: now.into(),
                updated_at: now.into(),
            },
        }
    }

    #[test]
    fn test_scope_denied_without_grant() {
        let client = client_with_scopes(vec!["content:generate"]);
        let err = client
            .require_scope("bulk:process", "Insufficient permissions for bulk processing")
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Insufficient permissions for bulk processing");
    }

    #[test]
    fn test_wildcard_scope_allows_everything() {
        let client = client_with_scopes(vec!["*"]);
        assert!(client.require_scope("bulk:process", "denied").is_ok());
        assert!(client.require_scope("keys:manage", "denied").is_ok());
    }

    #[test]
    fn test_rate_limit_headers_attached() {
        let decision = RateLimitDecision {
            admitted: true,
            limit: 100,
            remaining: 41,
            reset_epoch: 1_714_662_000,
        };
        let response = with_rate_limit_headers(axum::Json(serde_json::json!({"ok": true})), decision);
        let headers = response.headers();
        assert_eq!(headers.get("x-ratelimit-limit").unwrap(), "100");
        assert_eq!(headers.get("x-ratelimit-remaining").unwrap(), "41");
        assert_eq!(headers.get("x-ratelimit-reset").unwrap(), "1714662000");
    }
}
