//! CopyFlow Bulk Worker
//!
//! Consumes bulk job descriptors from the queue and drives each job
//! through its state machine:
//! 1. Receives a job descriptor from SQS
//! 2. Processes items strictly in input order against the generation engine
//! 3. Checkpoints progress after every item
//! 4. Finalizes the job and emits a completion notification
//!
//! At startup (and periodically) the worker rescans the database for jobs
//! left in a non-terminal state and resumes them from their last
//! checkpoint, so a crash or a lost queue message never strands a job.

mod processor;

use crate::processor::BulkProcessor;
use copyflow_common::{
    config::AppConfig,
    db::DbPool,
    generation::{CopyEngine, OpenAiChatModel},
    notify,
    queue::{BulkJobMessage, Queue, QueueConfig},
    Repository, VERSION,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Interval between database rescans for stranded jobs
const RESCAN_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(true)
        .json()
        .init();

    info!("Starting CopyFlow Bulk Worker v{}", VERSION);

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        e
    })?;

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;
    let repository = Repository::new(db);

    // Generation engine
    let model = Arc::new(OpenAiChatModel::new(&config.generation)?);
    let engine = Arc::new(CopyEngine::new(
        model,
        &config.generation,
        config.scrape.allowed_domains.clone(),
    ));

    info!(model = %config.generation.model, "Generation engine initialized");

    // Completion notifier
    let notifier = notify::notifier_from_config(&config.notifications)?;

    let processor = Arc::new(BulkProcessor::new(repository.clone(), engine, notifier));

    // Resume any jobs interrupted before the last shutdown.
    resume_stranded_jobs(&repository, &processor).await;

    // Queue mode, or pure database polling when no queue is configured.
    let queue = match config.queue.bulk_queue_url.clone() {
        Some(url) => {
            info!(url = %url, "Connecting to bulk queue...");
            let queue_config = QueueConfig {
                url,
                dlq_url: config.queue.dlq_url.clone(),
                visibility_timeout: config.queue.visibility_timeout_secs as i32,
                wait_time_seconds: config.queue.poll_timeout_secs as i32,
                max_messages: config.queue.batch_size as i32,
            };
            Some(Queue::new(queue_config).await?)
        }
        None => {
            warn!("queue.bulk_queue_url not set; falling back to database polling");
            None
        }
    };

    info!("Bulk worker ready");

    match queue {
        Some(queue) => queue_loop(queue, repository, processor).await,
        None => polling_loop(repository, processor).await,
    }

    info!("Bulk worker shutting down");
    Ok(())
}

/// Re-drive every job left in a non-terminal state. Each resumes from its
/// last checkpoint; per-job errors are logged and do not stop the scan.
async fn resume_stranded_jobs(repository: &Repository, processor: &BulkProcessor) {
    match repository.find_resumable_jobs().await {
        Ok(jobs) => {
            if !jobs.is_empty() {
                info!(count = jobs.len(), "Resuming stranded bulk jobs");
            }
            for job in jobs {
                if let Err(e) = processor.process_job(job.id).await {
                    error!(job_id = %job.id, error = %e, "Failed to resume job");
                }
            }
        }
        Err(e) => {
            error!(error = %e, "Failed to scan for stranded jobs");
        }
    }
}

/// Main loop in queue mode. Messages are deleted as soon as they are
/// received: crash recovery belongs to the database rescan, not to queue
/// redelivery, and a redelivered terminal job would be skipped anyway.
async fn queue_loop(queue: Queue, repository: Repository, processor: Arc<BulkProcessor>) {
    let mut consecutive_failures: u32 = 0;
    const MAX_FAILURES: u32 = 5;
    const CIRCUIT_BREAK_DURATION: Duration = Duration::from_secs(30);

    let mut rescan = tokio::time::interval(RESCAN_INTERVAL);
    rescan.reset();

    loop {
        if consecutive_failures >= MAX_FAILURES {
            warn!(
                failures = consecutive_failures,
                "Circuit breaker open, pausing..."
            );
            tokio::time::sleep(CIRCUIT_BREAK_DURATION).await;
            consecutive_failures = 0;
            info!("Circuit breaker reset, resuming...");
        }

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = rescan.tick() => {
                // Catches jobs whose enqueue failed at submission time.
                resume_stranded_jobs(&repository, &processor).await;
            }
            result = queue.receive::<BulkJobMessage>() => {
                match result {
                    Ok(messages) => {
                        consecutive_failures = 0;
                        for (message, receipt_handle) in messages {
                            info!(job_id = %message.job_id, "Received bulk job");

                            if let Err(e) = queue.delete(&receipt_handle).await {
                                error!(error = %e, "Failed to delete message");
                            }

                            if let Err(e) = processor.process_job(message.job_id).await {
                                error!(
                                    job_id = %message.job_id,
                                    error = %e,
                                    "Failed to process bulk job"
                                );
                            }
                        }
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(
                            error = %e,
                            failures = consecutive_failures,
                            "Failed to receive messages from queue"
                        );
                        tokio::time::sleep(Duration::from_secs(5)).await;
                    }
                }
            }
        }
    }
}

/// Main loop without a queue: poll the database for pending work
async fn polling_loop(repository: Repository, processor: Arc<BulkProcessor>) {
    let mut tick = tokio::time::interval(Duration::from_secs(10));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
            _ = tick.tick() => {
                resume_stranded_jobs(&repository, &processor).await;
            }
        }
    }
}
