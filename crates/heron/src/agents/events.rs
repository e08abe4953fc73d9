use serde::{Deserialize, Serialize};

/// Lifecycle states reported for a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Completed,
    Failed,
    Cancelled,
    Expired,
    #[serde(other)]
    Unknown,
}

/// One event from the agent run stream
///
/// A closed union so the dispatcher can match exhaustively: message deltas
/// carry new response text, run-status events carry lifecycle transitions
/// (with the last error on failure), and raw error events carry whatever
/// payload the backend attached.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentStreamEvent {
    MessageDelta {
        text: String,
    },
    RunStatus {
        status: RunStatus,
        last_error: Option<String>,
    },
    Error {
        payload: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parses_wire_strings() {
        assert_eq!(
            serde_json::from_str::<RunStatus>("\"in_progress\"").unwrap(),
            RunStatus::InProgress
        );
        assert_eq!(
            serde_json::from_str::<RunStatus>("\"failed\"").unwrap(),
            RunStatus::Failed
        );
        assert_eq!(
            serde_json::from_str::<RunStatus>("\"something_new\"").unwrap(),
            RunStatus::Unknown
        );
    }
}
