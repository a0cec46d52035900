use serde::{Deserialize, Serialize};

/// Outcome summary of one job execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerResult {
    pub success: bool,
    /// Human-readable summary, shown to the operator.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Description of the entity the job touched.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected: Option<String>,
}

impl WorkerResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            reason: None,
            affected: None,
        }
    }

    pub fn failure(message: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            reason: Some(reason.into()),
            affected: None,
        }
    }

    /// A stop without a failure, e.g. after cancellation.
    pub fn incomplete(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            reason: None,
            affected: None,
        }
    }

    pub fn with_affected(mut self, affected: impl Into<String>) -> Self {
        self.affected = Some(affected.into());
        self
    }
}
