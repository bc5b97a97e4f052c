//! Bulk job processor
//!
//! Drives one job through `pending -> processing -> completed | failed`.
//! Items are processed strictly in input order, one at a time; every item's
//! outcome is durably checkpointed before the next item starts, so a crash
//! loses at most the in-flight item. Per-item failures are contained: they
//! increment the failure counter and the loop continues. Only faults that
//! escape the per-item boundary fail the whole job.

use copyflow_common::content::{GenerationRequest, ProductCopy, RawGenerationItem};
use copyflow_common::db::models::{BulkJob, ItemStatus, JobStatus};
use copyflow_common::db::NewJobItem;
use copyflow_common::errors::{AppError, Result};
use copyflow_common::metrics::{record_bulk_item, record_bulk_job};
use copyflow_common::notify::CompletionNotifier;
use copyflow_common::{CopyEngine, Repository};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Outcome of one item, produced inside the containment boundary
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Succeeded {
        request: GenerationRequest,
        copy: ProductCopy,
    },
    Failed {
        error: String,
    },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Succeeded { .. })
    }
}

/// Running progress counters of one job.
/// Invariant: `successful + failed == processed` after every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchTally {
    pub processed: i32,
    pub successful: i32,
    pub failed: i32,
}

impl BatchTally {
    pub fn new(processed: i32, successful: i32, failed: i32) -> Self {
        Self {
            processed,
            successful,
            failed,
        }
    }

    pub fn zero() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn record(&mut self, success: bool) {
        self.processed += 1;
        if success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }
}

/// Process one item inside the containment boundary: validation failures
/// and generation failures both become a `Failed` outcome with a readable
/// message, never an error that aborts the batch.
pub async fn execute_item(engine: &CopyEngine, raw: &RawGenerationItem) -> ItemOutcome {
    let request = match GenerationRequest::validate(raw) {
        Ok(request) => request,
        Err(e) => {
            return ItemOutcome::Failed {
                error: e.to_string(),
            }
        }
    };

    match engine.generate(&request).await {
        Ok(copy) => ItemOutcome::Succeeded { request, copy },
        Err(e) => ItemOutcome::Failed {
            error: e.to_string(),
        },
    }
}

/// Drive `items[start..]` strictly in input order. The checkpoint callback
/// runs after every item and must complete before the next item starts; a
/// checkpoint error is a pipeline fault and aborts the job.
pub async fn process_items<F, Fut>(
    engine: &CopyEngine,
    items: &[RawGenerationItem],
    start: usize,
    mut tally: BatchTally,
    mut checkpoint: F,
) -> Result<BatchTally>
where
    F: FnMut(usize, ItemOutcome, BatchTally) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    for (index, raw) in items.iter().enumerate().skip(start) {
        let outcome = execute_item(engine, raw).await;
        tally.record(outcome.is_success());
        record_bulk_item(outcome.is_success());

        checkpoint(index, outcome, tally).await?;
    }

    Ok(tally)
}

/// Bulk job processor
pub struct BulkProcessor {
    repository: Repository,
    engine: Arc<CopyEngine>,
    notifier: Arc<dyn CompletionNotifier>,
}

impl BulkProcessor {
    pub fn new(
        repository: Repository,
        engine: Arc<CopyEngine>,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Self {
        Self {
            repository,
            engine,
            notifier,
        }
    }

    /// Process one job to a terminal state. Safe to call with an already
    /// terminal job (redelivered message): it is skipped. A job found in
    /// `processing` is an interrupted run and resumes from its last
    /// checkpoint.
    #[instrument(skip(self), fields(job_id = %job_id))]
    pub async fn process_job(&self, job_id: Uuid) -> Result<()> {
        let started = Instant::now();

        let job = self
            .repository
            .find_bulk_job(job_id)
            .await?
            .ok_or_else(|| AppError::JobNotFound {
                id: job_id.to_string(),
            })?;

        if job.is_terminal() {
            info!(status = %job.status, "Job already terminal, skipping");
            return Ok(());
        }

        let tenant = self.repository.find_tenant_by_id(job.tenant_id).await?;

        let job = match job.job_status() {
            JobStatus::Pending => {
                self.repository
                    .transition_job(job.id, JobStatus::Processing, None)
                    .await?
            }
            _ => job,
        };

        match self.run(&job).await {
            Ok(tally) => {
                self.repository
                    .transition_job(job.id, JobStatus::Completed, None)
                    .await?;
                record_bulk_job(started.elapsed().as_secs_f64(), "completed");

                info!(
                    total = job.total_items,
                    successful = tally.successful,
                    failed = tally.failed,
                    "Bulk job completed"
                );

                // Delivery is best-effort; the job is already terminal.
                if let Some(tenant) = tenant {
                    if let Err(e) = self
                        .notifier
                        .bulk_job_completed(
                            &tenant.owner_email,
                            &job.name,
                            tally.successful,
                            tally.failed,
                        )
                        .await
                    {
                        warn!(error = %e, "Failed to send completion notification");
                    }
                }

                Ok(())
            }
            Err(e) => {
                // Pipeline fault outside the per-item boundary.
                if let Err(te) = self
                    .repository
                    .transition_job(job.id, JobStatus::Failed, Some(e.to_string()))
                    .await
                {
                    tracing::error!(error = %te, "Failed to mark job as failed");
                }
                record_bulk_job(started.elapsed().as_secs_f64(), "failed");

                tracing::error!(error = %e, "Bulk job failed");
                Err(e)
            }
        }
    }

    /// The per-item loop. Resume point and running counters come from the
    /// checkpointed item rows, which are the source of truth.
    async fn run(&self, job: &BulkJob) -> Result<BatchTally> {
        let (processed, successful, failed) =
            self.repository.recount_job_progress(job.id).await?;
        let start = processed as usize;

        if start > 0 {
            info!(resumed_at = start, "Resuming interrupted job from checkpoint");
        }

        let tally = BatchTally::new(processed, successful, failed);
        let items = &job.input_items.0;

        let repository = self.repository.clone();
        let job_id = job.id;
        let tenant_id = job.tenant_id;
        let api_key_id = job.api_key_id;

        process_items(&self.engine, items, start, tally, move |index, outcome, tally| {
            let repository = repository.clone();
            async move {
                let item = match outcome {
                    ItemOutcome::Succeeded { request, copy } => {
                        let output = serde_json::to_value(&copy)?;
                        let generation = repository
                            .insert_generation(
                                tenant_id,
                                api_key_id,
                                Some(job_id),
                                &request.product_name,
                                request.category.as_str(),
                                request.writing_style.as_str(),
                                request.language.as_str(),
                                output.clone(),
                            )
                            .await?;

                        NewJobItem {
                            item_index: index as i32,
                            status: ItemStatus::Succeeded,
                            generation_id: Some(generation.id),
                            output: Some(output),
                            error_message: None,
                        }
                    }
                    ItemOutcome::Failed { error } => NewJobItem {
                        item_index: index as i32,
                        status: ItemStatus::Failed,
                        generation_id: None,
                        output: None,
                        error_message: Some(error),
                    },
                };

                repository
                    .checkpoint_item(job_id, item, tally.processed, tally.successful, tally.failed)
                    .await
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use copyflow_common::config::GenerationConfig;
    use copyflow_common::generation::{ChatModel, ChatRequest};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted model returning canned responses in call order
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String>>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
            })
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, _request: ChatRequest) -> Result<String> {
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(AppError::Generation {
                        message: "No content generated".to_string(),
                    })
                })
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn engine(model: Arc<dyn ChatModel>) -> CopyEngine {
        CopyEngine::new(
            model,
            &GenerationConfig {
                api_key: Some("test".to_string()),
                api_base: "http://localhost".to_string(),
                model: "gpt-4".to_string(),
                vision_model: "gpt-4-vision-preview".to_string(),
                timeout_secs: 30,
                temperature: 0.7,
                viral_temperature: 0.8,
            },
            vec![],
        )
    }

    fn item(name: &str) -> RawGenerationItem {
        RawGenerationItem {
            product_name: name.to_string(),
            category: "electronics".to_string(),
            writing_style: "professional".to_string(),
            language: "en".to_string(),
        }
    }

    fn copy_json() -> String {
        serde_json::json!({
            "productTitle": "T",
            "productDescription": "D",
            "seoTitle": "S",
            "metaDescription": "M",
            "callToAction": "Buy",
            "keyFeatures": ["a", "b", "c", "d", "e"],
            "tagsKeywords": ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10"]
        })
        .to_string()
    }

    /// Records (index, success, tally) per checkpoint call
    type CheckpointLog = Arc<Mutex<Vec<(usize, bool, BatchTally)>>>;

    fn recording_checkpoint(
        log: CheckpointLog,
    ) -> impl FnMut(usize, ItemOutcome, BatchTally) -> std::future::Ready<Result<()>> {
        move |index, outcome, tally| {
            log.lock().unwrap().push((index, outcome.is_success(), tally));
            std::future::ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_all_items_succeed() {
        let n = 3;
        let engine = engine(ScriptedModel::new(vec![
            Ok(copy_json()),
            Ok(copy_json()),
            Ok(copy_json()),
        ]));
        let items: Vec<_> = (0..n).map(|i| item(&format!("Item {}", i))).collect();
        let log: CheckpointLog = Arc::new(Mutex::new(Vec::new()));

        let tally = process_items(
            &engine,
            &items,
            0,
            BatchTally::zero(),
            recording_checkpoint(log.clone()),
        )
        .await
        .unwrap();

        assert_eq!(tally.processed, n as i32);
        assert_eq!(tally.successful + tally.failed, n as i32);
        assert_eq!(tally.failed, 0);

        // One checkpoint per item, in strict input order.
        let log = log.lock().unwrap();
        assert_eq!(log.len(), n);
        for (i, (index, _, tally)) in log.iter().enumerate() {
            assert_eq!(*index, i);
            assert_eq!(tally.processed, (i + 1) as i32);
        }
    }

    #[tokio::test]
    async fn test_validation_failure_is_contained() {
        // Second item has an empty product name; only two generation calls
        // should reach the model.
        let engine = engine(ScriptedModel::new(vec![Ok(copy_json()), Ok(copy_json())]));
        let items = vec![item("iPhone 15 Pro"), item(""), item("Pixel 9")];
        let log: CheckpointLog = Arc::new(Mutex::new(Vec::new()));

        let tally = process_items(
            &engine,
            &items,
            0,
            BatchTally::zero(),
            recording_checkpoint(log.clone()),
        )
        .await
        .unwrap();

        assert_eq!(tally.processed, 3);
        assert_eq!(tally.successful, 2);
        assert_eq!(tally.failed, 1);

        // The failure is at index 1, aligned with its input position.
        let log = log.lock().unwrap();
        assert_eq!(log[0].1, true);
        assert_eq!(log[1].1, false);
        assert_eq!(log[2].1, true);
    }

    #[tokio::test]
    async fn test_two_item_batch_with_one_invalid_item() {
        let engine = engine(ScriptedModel::new(vec![Ok(copy_json())]));
        let items = vec![item("iPhone 15 Pro"), item("")];
        let log: CheckpointLog = Arc::new(Mutex::new(Vec::new()));

        let tally = process_items(
            &engine,
            &items,
            0,
            BatchTally::zero(),
            recording_checkpoint(log.clone()),
        )
        .await
        .unwrap();

        assert_eq!(tally.processed, 2);
        assert_eq!(tally.successful, 1);
        assert_eq!(tally.failed, 1);
    }

    #[tokio::test]
    async fn test_generation_error_does_not_abort_batch() {
        // Second model response is unparsable; the third item still runs.
        let engine = engine(ScriptedModel::new(vec![
            Ok(copy_json()),
            Ok("I'm sorry, I can't do that.".to_string()),
            Ok(copy_json()),
        ]));
        let items = vec![item("A"), item("B"), item("C")];
        let log: CheckpointLog = Arc::new(Mutex::new(Vec::new()));

        let tally = process_items(
            &engine,
            &items,
            0,
            BatchTally::zero(),
            recording_checkpoint(log.clone()),
        )
        .await
        .unwrap();

        assert_eq!(tally.processed, 3);
        assert_eq!(tally.successful, 2);
        assert_eq!(tally.failed, 1);
        assert_eq!(log.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_failed_item_carries_error_message() {
        let engine = engine(ScriptedModel::new(vec![]));
        let outcome = execute_item(&engine, &item("")).await;
        match outcome {
            ItemOutcome::Failed { error } => assert_eq!(error, "Product name is required"),
            ItemOutcome::Succeeded { .. } => panic!("expected a contained failure"),
        }
    }

    #[tokio::test]
    async fn test_resume_skips_checkpointed_prefix() {
        // Four items; the first two are already checkpointed.
        let engine = engine(ScriptedModel::new(vec![Ok(copy_json()), Ok(copy_json())]));
        let items = vec![item("A"), item("B"), item("C"), item("D")];
        let log: CheckpointLog = Arc::new(Mutex::new(Vec::new()));

        let tally = process_items(
            &engine,
            &items,
            2,
            BatchTally::new(2, 2, 0),
            recording_checkpoint(log.clone()),
        )
        .await
        .unwrap();

        assert_eq!(tally.processed, 4);
        assert_eq!(tally.successful, 4);

        let log = log.lock().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].0, 2);
        assert_eq!(log[1].0, 3);
    }

    #[tokio::test]
    async fn test_checkpoint_failure_is_a_pipeline_fault() {
        let engine = engine(ScriptedModel::new(vec![Ok(copy_json()), Ok(copy_json())]));
        let items = vec![item("A"), item("B")];

        let result = process_items(&engine, &items, 0, BatchTally::zero(), |_, _, _| {
            std::future::ready(Err(AppError::Internal {
                message: "checkpoint write failed".to_string(),
            }))
        })
        .await;

        assert!(result.is_err());
    }

    #[test]
    fn test_tally_invariant() {
        let mut tally = BatchTally::zero();
        for i in 0..10 {
            tally.record(i % 3 != 0);
            assert_eq!(tally.successful + tally.failed, tally.processed);
        }
        assert_eq!(tally.processed, 10);
    }
}
