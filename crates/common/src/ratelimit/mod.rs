//! Per-credential rate limiting
//!
//! Each plan tier maps to a fixed request quota over a one-hour window.
//! Windows are fixed and epoch-aligned; admission is a single atomic
//! conditional increment on the `(credential, window)` counter, so the
//! check and the consume cannot race.
//!
//! Rejected requests are appended to the usage ledger with status 429 by
//! the caller, but they do not increment the admission counter: a rejected
//! call never consumes quota in the window that rejected it.
//!
//! Known limitation of fixed windows: a client can burst up to twice the
//! quota across a window boundary.

use crate::db::models::Plan;
use crate::db::Repository;
use crate::errors::Result;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

/// Window length shared by every plan tier
pub const WINDOW_SECS: i64 = 3600;

/// A plan tier's admission quota
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateQuota {
    pub requests: u32,
    pub window_secs: i64,
}

/// Quota per plan tier: 100/hour on the lower tiers, 1000/hour for
/// business, 10000/hour for enterprise.
pub fn quota_for_plan(plan: Plan) -> RateQuota {
    let requests = match plan {
        Plan::Free | Plan::Pro => 100,
        Plan::Business => 1000,
        Plan::Enterprise => 10000,
    };

    RateQuota {
        requests,
        window_secs: WINDOW_SECS,
    }
}

/// Start of the fixed window containing `now`
pub fn window_start(now: DateTime<Utc>, window_secs: i64) -> DateTime<Utc> {
    let ts = now.timestamp();
    let aligned = ts - ts.rem_euclid(window_secs);
    Utc.timestamp_opt(aligned, 0).single().unwrap_or(now)
}

/// Outcome of an admission check, carrying everything the HTTP layer needs
/// to surface the `X-RateLimit-*` headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub admitted: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_epoch: i64,
}

impl RateLimitDecision {
    /// Header name/value pairs surfaced on every programmatic response
    pub fn headers(&self) -> [(&'static str, String); 3] {
        [
            ("x-ratelimit-limit", self.limit.to_string()),
            ("x-ratelimit-remaining", self.remaining.to_string()),
            ("x-ratelimit-reset", self.reset_epoch.to_string()),
        ]
    }
}

/// Admission control service
#[derive(Clone)]
pub struct RateLimiter {
    repository: Repository,
}

impl RateLimiter {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Decide admit/reject for a credential under its plan tier
    pub async fn admit(&self, api_key_id: Uuid, plan: Plan) -> Result<RateLimitDecision> {
        let quota = quota_for_plan(plan);
        let now = Utc::now();
        let start = window_start(now, quota.window_secs);
        let reset_epoch = start.timestamp() + quota.window_secs;

        match self
            .repository
            .try_consume_rate(api_key_id, start, quota.requests)
            .await?
        {
            Some(count) => Ok(RateLimitDecision {
                admitted: true,
                limit: quota.requests,
                remaining: (quota.requests as i64 - count).max(0) as u32,
                reset_epoch,
            }),
            None => {
                metrics::counter!("copyflow_rate_limit_rejections_total").increment(1);

                let used = self.repository.window_count(api_key_id, start).await?;
                Ok(RateLimitDecision {
                    admitted: false,
                    limit: quota.requests,
                    remaining: (quota.requests as i64 - used).max(0) as u32,
                    reset_epoch,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_per_tier() {
        assert_eq!(quota_for_plan(Plan::Free).requests, 100);
        assert_eq!(quota_for_plan(Plan::Pro).requests, 100);
        assert_eq!(quota_for_plan(Plan::Business).requests, 1000);
        assert_eq!(quota_for_plan(Plan::Enterprise).requests, 10000);
        assert_eq!(quota_for_plan(Plan::Free).window_secs, 3600);
    }

    #[test]
    fn test_window_alignment() {
        let now = Utc.with_ymd_and_hms(2025, 5, 2, 14, 37, 19).unwrap();
        let start = window_start(now, WINDOW_SECS);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 5, 2, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_window_boundary() {
        let exactly = Utc.with_ymd_and_hms(2025, 5, 2, 14, 0, 0).unwrap();
        assert_eq!(window_start(exactly, WINDOW_SECS), exactly);

        let next = Utc.with_ymd_and_hms(2025, 5, 2, 15, 0, 0).unwrap();
        assert_ne!(window_start(exactly, WINDOW_SECS), window_start(next, WINDOW_SECS));
    }

    #[test]
    fn test_requests_in_distinct_windows_do_not_share_a_counter() {
        let first = Utc.with_ymd_and_hms(2025, 5, 2, 14, 59, 59).unwrap();
        let second = first + chrono::Duration::seconds(1);
        assert_ne!(
            window_start(first, WINDOW_SECS),
            window_start(second, WINDOW_SECS)
        );
    }

    #[test]
    fn test_decision_headers() {
        let decision = RateLimitDecision {
            admitted: true,
            limit: 100,
            remaining: 57,
            reset_epoch: 1_714_662_000,
        };
        let headers = decision.headers();
        assert_eq!(headers[0], ("x-ratelimit-limit", "100".to_string()));
        assert_eq!(headers[1], ("x-ratelimit-remaining", "57".to_string()));
        assert_eq!(headers[2], ("x-ratelimit-reset", "1714662000".to_string()));
    }
}
