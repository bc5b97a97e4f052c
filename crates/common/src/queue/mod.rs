//! SQS queue integration for async bulk job processing
//!
//! Submission enqueues a job descriptor; a separate worker consumes it.
//! The worker deletes a message as soon as it is received: crash recovery
//! is handled by the database resume scan, not by queue redelivery, so a
//! redelivered message for a terminal job would be a no-op anyway.

use crate::errors::{AppError, Result};
use aws_sdk_sqs::Client as SqsClient;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

/// SQS queue configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue URL
    pub url: String,
    /// Dead letter queue URL (optional)
    pub dlq_url: Option<String>,
    /// Visibility timeout in seconds
    pub visibility_timeout: i32,
    /// Wait time for long polling (seconds)
    pub wait_time_seconds: i32,
    /// Maximum number of messages per poll
    pub max_messages: i32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            dlq_url: None,
            visibility_timeout: 300,
            wait_time_seconds: 20,
            max_messages: 10,
        }
    }
}

/// The job descriptor handed from the gateway to the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkJobMessage {
    pub job_id: Uuid,
    pub tenant_id: Uuid,
}

/// SQS queue client wrapper
pub struct Queue {
    client: SqsClient,
    config: QueueConfig,
}

impl Queue {
    /// Create a new queue client
    pub async fn new(config: QueueConfig) -> Result<Self> {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        let client = SqsClient::new(&aws_config);

        Ok(Self { client, config })
    }

    /// Create with existing AWS config
    pub fn with_client(client: SqsClient, config: QueueConfig) -> Self {
        Self { client, config }
    }

    /// Send a message to the queue
    pub async fn send<T: Serialize>(&self, message: &T) -> Result<String> {
        let body = serde_json::to_string(message).map_err(|e| AppError::QueueError {
            message: format!("Failed to serialize message: {}", e),
        })?;

        let result = self
            .client
            .send_message()
            .queue_url(&self.config.url)
            .message_body(&body)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to send message: {}", e),
            })?;

        let message_id = result.message_id.unwrap_or_default();
        debug!(message_id = %message_id, "Message sent to queue");

        Ok(message_id)
    }

    /// Receive typed messages from the queue. Each entry pairs the parsed
    /// payload with its receipt handle. Unparsable bodies are logged and
    /// skipped; they will age out to the DLQ.
    pub async fn receive<T: DeserializeOwned>(&self) -> Result<Vec<(T, String)>> {
        let result = self
            .client
            .receive_message()
            .queue_url(&self.config.url)
            .max_number_of_messages(self.config.max_messages)
            .visibility_timeout(self.config.visibility_timeout)
            .wait_time_seconds(self.config.wait_time_seconds)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to receive messages: {}", e),
            })?;

        let messages = result.messages.unwrap_or_default();
        debug!(count = messages.len(), "Received messages from queue");

        let mut parsed = Vec::with_capacity(messages.len());
        for message in messages {
            let Some(receipt_handle) = message.receipt_handle else {
                continue;
            };
            let Some(body) = message.body else {
                warn!("Message has no body, skipping");
                continue;
            };
            match serde_json::from_str::<T>(&body) {
                Ok(payload) => parsed.push((payload, receipt_handle)),
                Err(e) => {
                    warn!(error = %e, "Failed to parse queue message, skipping");
                }
            }
        }

        Ok(parsed)
    }

    /// Delete a message after processing
    pub async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.config.url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| AppError::QueueError {
                message: format!("Failed to delete message: {}", e),
            })?;

        debug!("Message deleted from queue");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bulk_job_message_serialization() {
        let msg = BulkJobMessage {
            job_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
        };

        let json = serde_json::to_string(&msg).unwrap();
        let parsed: BulkJobMessage = serde_json::from_str(&json).unwrap();

        assert_eq!(msg.job_id, parsed.job_id);
        assert_eq!(msg.tenant_id, parsed.tenant_id);
    }

    #[test]
    fn test_queue_config_defaults() {
        let config = QueueConfig::default();
        assert_eq!(config.wait_time_seconds, 20);
        assert_eq!(config.max_messages, 10);
    }
}
