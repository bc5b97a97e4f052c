//! Bulk job handlers: submission and status polling

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use copyflow_common::{
    auth::SCOPE_BULK,
    content::{RawGenerationItem, MAX_BULK_ITEMS},
    db::models::{BulkInput, BulkJob, BulkJobItem, ItemStatus, JobStatus},
    errors::{AppError, Result},
    queue::BulkJobMessage,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::{admit, authenticate, record_outcome, with_rate_limit_headers};
use crate::AppState;

const BULK_ENDPOINT: &str = "/v1/bulk";

/// Bulk submission payload
#[derive(Debug, Deserialize)]
pub struct BulkSubmitRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub items: Vec<RawGenerationItem>,
}

/// Response returned immediately on submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkSubmitResponse {
    pub job_id: Uuid,
    pub status: String,
    pub total_items: i32,
    pub message: String,
}

/// Validate the submission envelope. Item *shape* is deliberately not
/// checked here: a malformed item becomes a contained per-item failure
/// during processing. The size bounds are checked before any job record
/// is created.
pub fn validate_submit_request(request: &BulkSubmitRequest) -> Result<()> {
    if request.name.trim().is_empty() {
        return Err(AppError::validation("Job name is required", Some("name")));
    }
    if request.items.is_empty() {
        return Err(AppError::validation(
            "At least one item is required",
            Some("items"),
        ));
    }
    if request.items.len() > MAX_BULK_ITEMS {
        return Err(AppError::validation(
            "Maximum 100 items per batch",
            Some("items"),
        ));
    }
    Ok(())
}

/// Submit a bulk job. Returns immediately; processing runs detached.
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BulkSubmitRequest>,
) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;
    client.require_scope(SCOPE_BULK, "Insufficient permissions for bulk processing")?;

    if !client.tenant.plan().allows_bulk() {
        return Err(AppError::Forbidden {
            message: "Business or Enterprise plan required for bulk processing".to_string(),
        });
    }

    let decision = admit(&state, &client, BULK_ENDPOINT, "POST").await?;

    let outcome = handle_submit(&state, &client, request).await;
    record_outcome(&state, &client, BULK_ENDPOINT, "POST", &outcome).await;

    Ok(with_rate_limit_headers(Json(outcome?), decision))
}

async fn handle_submit(
    state: &AppState,
    client: &crate::auth::ApiClient,
    request: BulkSubmitRequest,
) -> Result<BulkSubmitResponse> {
    validate_submit_request(&request)?;

    let job = state
        .repository
        .create_bulk_job(
            client.tenant.id,
            Some(client.key.id),
            request.name,
            BulkInput(request.items),
        )
        .await?;

    // Hand the job to the detached worker. If the enqueue fails the job
    // stays pending and the worker's startup resume scan picks it up.
    match &state.queue {
        Some(queue) => {
            let message = BulkJobMessage {
                job_id: job.id,
                tenant_id: job.tenant_id,
            };
            if let Err(e) = queue.send(&message).await {
                tracing::warn!(
                    job_id = %job.id,
                    error = %e,
                    "Failed to enqueue bulk job; it will be picked up by the worker resume scan"
                );
            }
        }
        None => {
            tracing::warn!(
                job_id = %job.id,
                "Bulk queue not configured; job will be picked up by the worker resume scan"
            );
        }
    }

    tracing::info!(
        job_id = %job.id,
        tenant_id = %job.tenant_id,
        total_items = job.total_items,
        "Bulk job submitted"
    );

    Ok(BulkSubmitResponse {
        job_id: job.id,
        status: String::from(JobStatus::Pending),
        total_items: job.total_items,
        message: "Bulk processing job started".to_string(),
    })
}

/// Status poll query parameters
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub job_id: Option<Uuid>,
}

/// One entry of a completed job's result list, index-aligned with the
/// submitted items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkItemResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Read-only projection of a job's current state
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub name: String,
    pub status: String,
    pub total_items: i32,
    pub processed: i32,
    pub successful: i32,
    pub failed: i32,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<BulkItemResult>>,
}

/// Project a stored item row into its wire shape
pub fn item_result(item: &BulkJobItem) -> BulkItemResult {
    match item.item_status() {
        ItemStatus::Succeeded => {
            let mut data = item.output.clone().unwrap_or_else(|| serde_json::json!({}));
            if let (Some(object), Some(generation_id)) = (data.as_object_mut(), item.generation_id)
            {
                object.insert(
                    "id".to_string(),
                    serde_json::json!(generation_id.to_string()),
                );
            }
            BulkItemResult {
                success: true,
                data: Some(data),
                error: None,
            }
        }
        ItemStatus::Failed => BulkItemResult {
            success: false,
            data: None,
            error: Some(
                item.error_message
                    .clone()
                    .unwrap_or_else(|| "Unknown error".to_string()),
            ),
        },
    }
}

/// Assemble the snapshot. The result list is present only on completed
/// jobs; it is a projection of the checkpointed item rows, so repeated
/// polls return identical results.
pub fn snapshot(job: &BulkJob, items: Option<&[BulkJobItem]>) -> JobSnapshot {
    let results = match (job.job_status(), items) {
        (JobStatus::Completed, Some(items)) => Some(items.iter().map(item_result).collect()),
        _ => None,
    };

    JobSnapshot {
        job_id: job.id,
        name: job.name.clone(),
        status: job.status.clone(),
        total_items: job.total_items,
        processed: job.processed,
        successful: job.successful,
        failed: job.failed,
        created_at: job.created_at.to_rfc3339(),
        completed_at: job.completed_at.map(|dt| dt.to_rfc3339()),
        results,
    }
}

/// Poll a bulk job's status. Tenant isolation is enforced here: a job
/// belonging to another tenant is indistinguishable from an absent one.
pub async fn status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> Result<Response> {
    let client = authenticate(&state, &headers).await?;

    let outcome = handle_status(&state, &client, query).await;
    record_outcome(&state, &client, BULK_ENDPOINT, "GET", &outcome).await;

    Ok(Json(outcome?).into_response())
}

async fn handle_status(
    state: &AppState,
    client: &crate::auth::ApiClient,
    query: StatusQuery,
) -> Result<JobSnapshot> {
    let job_id = query
        .job_id
        .ok_or_else(|| AppError::validation("Job ID is required", Some("jobId")))?;

    let job = state
        .repository
        .find_bulk_job_for_tenant(job_id, client.tenant.id)
        .await?
        .ok_or_else(|| AppError::JobNotFound {
            id: job_id.to_string(),
        })?;

    let items = if job.job_status() == JobStatus::Completed {
        Some(state.repository.job_items(job.id).await?)
    } else {
        None
    };

    Ok(snapshot(&job, items.as_deref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn raw_item() -> RawGenerationItem {
        RawGenerationItem {
            product_name: "Mug".to_string(),
            category: "home".to_string(),
            writing_style: "casual".to_string(),
            language: "en".to_string(),
        }
    }

    fn submit_request(count: usize) -> BulkSubmitRequest {
        BulkSubmitRequest {
            name: "Batch1".to_string(),
            items: vec![raw_item(); count],
        }
    }

    fn job(status: JobStatus, processed: i32, successful: i32, failed: i32) -> BulkJob {
        let now = Utc::now();
        BulkJob {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            api_key_id: None,
            name: "Batch1".to_string(),
            status: String::from(status),
            total_items: processed,
            processed,
            successful,
            failed,
            input_items: BulkInput::default(),
            error_message: None,
            created_at: now.into(),
            started_at: None,
            completed_at: status.is_terminal().then(|| now.into()),
        }
    }

    #[test]
    fn test_submit_bounds() {
        assert!(validate_submit_request(&submit_request(1)).is_ok());
        assert!(validate_submit_request(&submit_request(MAX_BULK_ITEMS)).is_ok());
    }

    #[test]
    fn test_empty_batch_rejected() {
        let err = validate_submit_request(&submit_request(0)).unwrap_err();
        assert_eq!(err.to_string(), "At least one item is required");
    }

    #[test]
    fn test_oversized_batch_rejected() {
        let err = validate_submit_request(&submit_request(MAX_BULK_ITEMS + 1)).unwrap_err();
        assert_eq!(err.to_string(), "Maximum 100 items per batch");
    }

    #[test]
    fn test_missing_name_rejected() {
        let mut request = submit_request(1);
        request.name = "  ".to_string();
        let err = validate_submit_request(&request).unwrap_err();
        assert_eq!(err.to_string(), "Job name is required");
    }

    #[test]
    fn test_malformed_items_pass_submission() {
        // Item shape is validated per item during processing, not here.
        let mut request = submit_request(2);
        request.items[1].product_name = String::new();
        assert!(validate_submit_request(&request).is_ok());
    }

    #[test]
    fn test_snapshot_hides_results_until_completed() {
        let pending = snapshot(&job(JobStatus::Pending, 0, 0, 0), None);
        assert_eq!(pending.status, "pending");
        assert!(pending.results.is_none());

        let json = serde_json::to_value(&pending).unwrap();
        assert!(json.get("results").is_none());
        assert!(json.get("jobId").is_some());

        let processing = snapshot(&job(JobStatus::Processing, 1, 1, 0), None);
        assert!(processing.results.is_none());
    }

    #[test]
    fn test_snapshot_of_completed_job_includes_results() {
        let now = Utc::now();
        let items = vec![
            BulkJobItem {
                id: Uuid::new_v4(),
                job_id: Uuid::new_v4(),
                item_index: 0,
                status: String::from(ItemStatus::Succeeded),
                generation_id: Some(Uuid::new_v4()),
                output: Some(serde_json::json!({"productTitle": "Mug"})),
                error_message: None,
                processed_at: now.into(),
            },
            BulkJobItem {
                id: Uuid::new_v4(),
                job_id: Uuid::new_v4(),
                item_index: 1,
                status: String::from(ItemStatus::Failed),
                generation_id: None,
                output: None,
                error_message: Some("Product name is required".to_string()),
                processed_at: now.into(),
            },
        ];

        let view = snapshot(&job(JobStatus::Completed, 2, 1, 1), Some(&items));
        let results = view.results.unwrap();
        assert_eq!(results.len(), 2);

        // Index-aligned: results[0] is the success, results[1] the failure.
        assert!(results[0].success);
        assert!(results[0].data.as_ref().unwrap().get("id").is_some());
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_deref(), Some("Product name is required"));
    }

    #[test]
    fn test_failed_job_snapshot_has_no_results() {
        let view = snapshot(&job(JobStatus::Failed, 1, 0, 1), Some(&[]));
        assert!(view.results.is_none());
    }
}
