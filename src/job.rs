//! Provider-side asynchronous jobs
//!
//! Mutating calls may answer with a job id instead of a finished resource.
//! A [`Job`] is observed, never stored: fetched on every probe and dropped
//! once the wait ends.

use crate::error::{CloudError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalized job state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl JobStatus {
    /// Map a raw job status. Unrecognized values become `Unknown`, which the
    /// waiter keeps polling.
    pub fn from_raw(raw: &str) -> Self {
        match raw.to_ascii_uppercase().as_str() {
            "INIT" | "PENDING" | "QUEUED" | "WAITING" => Self::Pending,
            "RUNNING" | "PROCESSING" | "EXECUTING" => Self::Running,
            "SUCCESS" | "SUCCEEDED" | "COMPLETED" | "FINISHED" | "DONE" => Self::Succeeded,
            "FAIL" | "FAILED" | "ERROR" | "CANCELED" | "CANCELLED" => Self::Failed,
            _ => Self::Unknown,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// Where a kind's jobs are read from
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobEndpoint {
    pub service: String,
    /// Path template with `{project}` and `{id}` placeholders
    pub path: String,
    /// Field wrapping the job object in the response, if any
    #[serde(default)]
    pub field: Option<String>,
}

impl Default for JobEndpoint {
    fn default() -> Self {
        Self {
            service: "jobs".to_string(),
            path: "{project}/jobs/{id}".to_string(),
            field: Some("job".to_string()),
        }
    }
}

/// Snapshot of a provider job
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub raw_status: String,
    /// Human-readable progress, e.g. "40%"
    pub progress: Option<String>,
    pub fail_reason: Option<String>,
    /// Provider payload describing affected resources
    pub entities: Value,
}

impl Job {
    /// Parse a job object. `id` is the id it was requested by.
    pub fn from_json(id: &str, value: &Value) -> Result<Self> {
        let raw_status = value
            .get("status")
            .and_then(|v| v.as_str())
            .ok_or_else(|| CloudError::Decode(format!("job {} has no status", id)))?
            .to_string();

        let text = |key: &str| {
            value
                .get(key)
                .and_then(|v| match v {
                    Value::String(s) if !s.is_empty() => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
        };

        Ok(Self {
            id: text("id")
                .or_else(|| text("job_id"))
                .unwrap_or_else(|| id.to_string()),
            status: JobStatus::from_raw(&raw_status),
            raw_status,
            progress: text("progress"),
            fail_reason: text("fail_reason").or_else(|| text("error_msg")),
            entities: value.get("entities").cloned().unwrap_or(Value::Null),
        })
    }

    pub fn is_succeeded(&self) -> bool {
        self.status == JobStatus::Succeeded
    }

    pub fn is_failed(&self) -> bool {
        self.status == JobStatus::Failed
    }

    /// Failure description for [`CloudError::OperationFailed`]
    pub fn failure(&self) -> CloudError {
        CloudError::OperationFailed {
            id: self.id.clone(),
            reason: self
                .fail_reason
                .clone()
                .unwrap_or_else(|| format!("job ended with status {}", self.raw_status)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_status_table() {
        assert_eq!(JobStatus::from_raw("SUCCESS"), JobStatus::Succeeded);
        assert_eq!(JobStatus::from_raw("fail"), JobStatus::Failed);
        assert_eq!(JobStatus::from_raw("Running"), JobStatus::Running);
        assert_eq!(JobStatus::from_raw("INIT"), JobStatus::Pending);
        assert_eq!(JobStatus::from_raw("weird"), JobStatus::Unknown);
        assert!(!JobStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_parse_job() {
        let job = Job::from_json(
            "j-1",
            &json!({
                "job_id": "j-1",
                "status": "FAIL",
                "progress": "80%",
                "fail_reason": "flavor sold out",
                "entities": {"instance_id": "db-1"}
            }),
        )
        .unwrap();

        assert!(job.is_failed());
        assert_eq!(job.progress.as_deref(), Some("80%"));
        assert_eq!(job.entities["instance_id"], "db-1");
        assert!(job.failure().to_string().contains("flavor sold out"));
    }

    #[test]
    fn test_missing_status_is_decode_error() {
        let err = Job::from_json("j-2", &json!({"id": "j-2"})).unwrap_err();
        assert!(matches!(err, CloudError::Decode(_)));
    }
}
