//! Usage ledger
//!
//! Append-only accounting of every inbound programmatic request, one record
//! per attempt (rejected ones included). Backs rate-limit window counting
//! and the usage analytics report. Recording is fire-and-forget: a failure
//! to write a usage record is logged and never allowed to break the
//! request path.

use crate::db::Repository;
use crate::errors::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reporting period for usage analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    OneDay,
    SevenDays,
    ThirtyDays,
    NinetyDays,
}

impl Period {
    /// Parse the `period` query parameter; unknown values fall back to the
    /// 30-day default.
    pub fn parse(value: Option<&str>) -> Period {
        match value {
            Some("1d") => Period::OneDay,
            Some("7d") => Period::SevenDays,
            Some("90d") => Period::NinetyDays,
            _ => Period::ThirtyDays,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneDay => "1d",
            Period::SevenDays => "7d",
            Period::ThirtyDays => "30d",
            Period::NinetyDays => "90d",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Period::OneDay => Duration::days(1),
            Period::SevenDays => Duration::days(7),
            Period::ThirtyDays => Duration::days(30),
            Period::NinetyDays => Duration::days(90),
        }
    }
}

/// Summary block of the usage report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub generations_count: u64,
    pub success_rate: f64,
}

/// One day of the daily breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyUsage {
    pub date: String,
    pub requests: i64,
}

/// One endpoint of the endpoint breakdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointUsage {
    pub endpoint: String,
    pub requests: i64,
}

/// The full usage analytics report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub period: String,
    pub summary: UsageSummary,
    pub daily_usage: Vec<DailyUsage>,
    pub endpoint_usage: Vec<EndpointUsage>,
}

/// Assemble the summary block. Successful = 2xx, failed = 4xx and above;
/// the success rate is a percentage of total requests.
pub fn build_summary(
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    generations_count: u64,
) -> UsageSummary {
    let success_rate = if total_requests > 0 {
        (successful_requests as f64 / total_requests as f64) * 100.0
    } else {
        0.0
    };

    UsageSummary {
        total_requests,
        successful_requests,
        failed_requests,
        generations_count,
        success_rate,
    }
}

/// Usage ledger service
#[derive(Clone)]
pub struct UsageLedger {
    repository: Repository,
}

impl UsageLedger {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Append one usage record. Never fails the caller: accounting errors
    /// are logged and dropped.
    pub async fn record(
        &self,
        api_key_id: Uuid,
        tenant_id: Uuid,
        endpoint: &str,
        method: &str,
        status_code: i32,
    ) {
        if let Err(e) = self
            .repository
            .insert_usage_record(api_key_id, tenant_id, endpoint, method, status_code)
            .await
        {
            tracing::error!(
                error = %e,
                %api_key_id,
                endpoint,
                status_code,
                "Failed to log API usage"
            );
        }

        metrics::counter!(
            "copyflow_usage_records_total",
            "status" => status_code.to_string()
        )
        .increment(1);
    }

    /// Count records for a credential since a window start
    pub async fn count_since(&self, api_key_id: Uuid, since: DateTime<Utc>) -> Result<u64> {
        self.repository.count_usage_since(api_key_id, since).await
    }

    /// Build the analytics report for a credential over a period
    pub async fn report(&self, api_key_id: Uuid, period: Period) -> Result<UsageReport> {
        let end = Utc::now();
        let start = end - period.duration();

        let (total, successful, failed) =
            self.repository.usage_counts(api_key_id, start, end).await?;

        let generations = self
            .repository
            .count_generations_between(api_key_id, start, end)
            .await?;

        let daily = self
            .repository
            .usage_daily_breakdown(api_key_id, start, end)
            .await?;

        let endpoints = self
            .repository
            .usage_endpoint_breakdown(api_key_id, start, end)
            .await?;

        Ok(UsageReport {
            period: period.as_str().to_string(),
            summary: build_summary(total, successful, failed, generations),
            daily_usage: daily
                .into_iter()
                .map(|(date, requests)| DailyUsage { date, requests })
                .collect(),
            endpoint_usage: endpoints
                .into_iter()
                .map(|(endpoint, requests)| EndpointUsage { endpoint, requests })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_parse() {
        assert_eq!(Period::parse(Some("1d")), Period::OneDay);
        assert_eq!(Period::parse(Some("7d")), Period::SevenDays);
        assert_eq!(Period::parse(Some("30d")), Period::ThirtyDays);
        assert_eq!(Period::parse(Some("90d")), Period::NinetyDays);
    }

    #[test]
    fn test_period_defaults_to_thirty_days() {
        assert_eq!(Period::parse(None), Period::ThirtyDays);
        assert_eq!(Period::parse(Some("2w")), Period::ThirtyDays);
    }

    #[test]
    fn test_period_durations() {
        assert_eq!(Period::OneDay.duration(), Duration::days(1));
        assert_eq!(Period::NinetyDays.duration(), Duration::days(90));
    }

    #[test]
    fn test_summary_math() {
        let summary = build_summary(10, 8, 2, 6);
        assert_eq!(summary.total_requests, 10);
        assert_eq!(summary.successful_requests, 8);
        assert_eq!(summary.failed_requests, 2);
        assert!((summary.success_rate - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summary_with_no_requests() {
        let summary = build_summary(0, 0, 0, 0);
        assert_eq!(summary.success_rate, 0.0);
    }

    #[test]
    fn test_report_wire_names() {
        let report = UsageReport {
            period: "7d".to_string(),
            summary: build_summary(1, 1, 0, 1),
            daily_usage: vec![DailyUsage {
                date: "2025-05-01".to_string(),
                requests: 1,
            }],
            endpoint_usage: vec![EndpointUsage {
                endpoint: "/v1/generate".to_string(),
                requests: 1,
            }],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["summary"].get("totalRequests").is_some());
        assert!(json["summary"].get("successRate").is_some());
        assert!(json.get("dailyUsage").is_some());
        assert!(json.get("endpointUsage").is_some());
    }
}
