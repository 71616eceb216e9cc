//! Health check handlers

use crate::AppState;
use axum::{extract::State, http::StatusCode, Json};
use learnforge_common::Result;
use serde::Serialize;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    NotReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Up,
    Down,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: Readiness,
    pub checks: HealthChecks,
}

#[derive(Serialize)]
pub struct HealthChecks {
    pub store: CheckResult,
}

#[derive(Debug, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CheckResult {
    /// Outcome of a store ping that took `elapsed`
    pub fn from_ping(outcome: Result<()>, elapsed: Duration) -> Self {
        match outcome {
            Ok(()) => Self {
                status: CheckStatus::Up,
                latency_ms: Some(elapsed.as_millis() as u64),
                error: None,
            },
            Err(e) => Self {
                status: CheckStatus::Down,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}

impl HealthChecks {
    pub fn readiness(&self) -> Readiness {
        match self.store.status {
            CheckStatus::Up => Readiness::Ready,
            CheckStatus::Down => Readiness::NotReady,
        }
    }
}

/// Liveness: the process is serving requests
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: learnforge_common::VERSION,
    })
}

/// Readiness: the learning store answers a ping. 503 while it does not.
pub async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let start = Instant::now();
    let outcome = state.store.ping().await;
    let checks = HealthChecks {
        store: CheckResult::from_ping(outcome, start.elapsed()),
    };

    let status = checks.readiness();
    let code = match status {
        Readiness::Ready => StatusCode::OK,
        Readiness::NotReady => StatusCode::SERVICE_UNAVAILABLE,
    };

    (code, Json(ReadyResponse { status, checks }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use learnforge_common::AppError;

    #[test]
    fn test_failed_ping_is_not_ready() {
        let checks = HealthChecks {
            store: CheckResult::from_ping(
                Err(AppError::DatabaseConnection {
                    message: "Primary ping failed".into(),
                }),
                Duration::from_millis(3),
            ),
        };

        assert_eq!(checks.store.status, CheckStatus::Down);
        assert_eq!(checks.readiness(), Readiness::NotReady);

        let body = serde_json::to_value(ReadyResponse {
            status: checks.readiness(),
            checks,
        })
        .unwrap();
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["checks"]["store"]["status"], "down");
        assert!(body["checks"]["store"].get("latency_ms").is_none());
        assert!(body["checks"]["store"]["error"]
            .as_str()
            .unwrap()
            .contains("Primary ping failed"));
    }

    #[test]
    fn test_successful_ping_reports_latency() {
        let check = CheckResult::from_ping(Ok(()), Duration::from_millis(7));

        assert_eq!(check.status, CheckStatus::Up);
        assert_eq!(check.latency_ms, Some(7));

        let body = serde_json::to_value(&check).unwrap();
        assert_eq!(body["status"], "up");
        assert!(body.get("error").is_none());
    }
}
