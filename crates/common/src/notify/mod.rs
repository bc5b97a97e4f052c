//! Completion notifications
//!
//! Delivery is an external collaborator: a transactional mail HTTP API.
//! The trait seam lets the worker run with a no-op notifier when mail is
//! not configured, and lets tests record sends. Notification failures are
//! logged by callers and never fail a job.

use crate::config::NotificationConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Trait for the completion-notification capability
#[async_trait]
pub trait CompletionNotifier: Send + Sync {
    /// Notify the owning user that a bulk job finished
    async fn bulk_job_completed(
        &self,
        to: &str,
        job_name: &str,
        successful: i32,
        failed: i32,
    ) -> Result<()>;
}

/// Subject line for a completed bulk job
pub fn completion_subject(job_name: &str) -> String {
    format!("Bulk Processing Complete: {}", job_name)
}

/// HTML body for a completed bulk job
pub fn completion_body(job_name: &str, successful: i32, failed: i32) -> String {
    format!(
        "<h2>Bulk Processing Complete</h2>\n\
         <p>Your bulk processing job \"{}\" has been completed.</p>\n\
         <ul>\n\
         <li>Successfully processed: {} items</li>\n\
         <li>Failed: {} items</li>\n\
         </ul>\n\
         <p>You can view the results in your CopyFlow dashboard.</p>",
        job_name, successful, failed
    )
}

/// Notifier backed by a transactional mail HTTP API
pub struct MailApiNotifier {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    from_address: String,
}

#[derive(Serialize)]
struct MailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: String,
    html: String,
}

impl MailApiNotifier {
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let base_url = config
            .mail_api_base
            .clone()
            .ok_or_else(|| AppError::Configuration {
                message: "notifications.mail_api_base is not set".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            base_url,
            api_key: config.mail_api_key.clone(),
            from_address: config.from_address.clone(),
        })
    }
}

#[async_trait]
impl CompletionNotifier for MailApiNotifier {
    async fn bulk_job_completed(
        &self,
        to: &str,
        job_name: &str,
        successful: i32,
        failed: i32,
    ) -> Result<()> {
        let url = format!("{}/messages", self.base_url);

        let body = MailRequest {
            from: &self.from_address,
            to,
            subject: completion_subject(job_name),
            html: completion_body(job_name, successful, failed),
        };

        let mut request = self.client.post(&url).json(&body);
        if let Some(ref key) = self.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request.send().await.map_err(|e| AppError::Notification {
            message: format!("Failed to send email: {}", e),
        })?;

        if !response.status().is_success() {
            return Err(AppError::Notification {
                message: format!("Mail API error: {}", response.status()),
            });
        }

        Ok(())
    }
}

/// Notifier that drops everything; used when mail is not configured
pub struct NoopNotifier;

#[async_trait]
impl CompletionNotifier for NoopNotifier {
    async fn bulk_job_completed(
        &self,
        _to: &str,
        job_name: &str,
        successful: i32,
        failed: i32,
    ) -> Result<()> {
        tracing::debug!(job_name, successful, failed, "Notifications disabled, skipping");
        Ok(())
    }
}

/// Build the configured notifier
pub fn notifier_from_config(config: &NotificationConfig) -> Result<Arc<dyn CompletionNotifier>> {
    if config.enabled && config.mail_api_base.is_some() {
        Ok(Arc::new(MailApiNotifier::new(config)?))
    } else {
        Ok(Arc::new(NoopNotifier))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_subject() {
        assert_eq!(
            completion_subject("Spring Catalog"),
            "Bulk Processing Complete: Spring Catalog"
        );
    }

    #[test]
    fn test_completion_body_counts() {
        let body = completion_body("Spring Catalog", 42, 3);
        assert!(body.contains("Spring Catalog"));
        assert!(body.contains("Successfully processed: 42 items"));
        assert!(body.contains("Failed: 3 items"));
    }

    #[test]
    fn test_noop_notifier_when_unconfigured() {
        let config = NotificationConfig {
            mail_api_base: None,
            mail_api_key: None,
            from_address: "noreply@copyflow.dev".to_string(),
            enabled: true,
        };
        assert!(notifier_from_config(&config).is_ok());
    }
}
