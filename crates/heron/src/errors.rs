use thiserror::Error;

/// Errors produced while generating a response
///
/// Every pipeline entry point catches internal failures exactly once at its
/// outer boundary and re-raises them as a single `Reply` error carrying the
/// pipeline name and the original message. The other variants are the
/// internal taxonomy that gets wrapped.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum ChatError {
    /// The normalized, reportable error surfaced to the caller
    #[error("Error generating response in {pipeline}: {message}")]
    Reply {
        pipeline: &'static str,
        message: String,
    },

    /// A completion or agent-service call failed (network, auth, quota)
    #[error("{0}")]
    Backend(String),

    /// The agent run reached its failed terminal state
    #[error("Run failed: {0}")]
    RunFailed(String),

    /// A completed run produced no authoritative agent message
    #[error("No response from the model.")]
    MissingResponse,

    /// The UI never produced a message object to stream into
    #[error("operation has no target to update")]
    NoLiveMessage,

    /// The selected profile has no usable model configuration
    #[error("Invalid model configuration: {0}")]
    Config(String),
}

impl ChatError {
    /// Wrap any error into the single reportable form for a pipeline
    pub fn reply<E: std::fmt::Display>(pipeline: &'static str, err: E) -> Self {
        ChatError::Reply {
            pipeline,
            message: err.to_string(),
        }
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_wraps_original_message() {
        let inner = ChatError::RunFailed("rate limited".to_string());
        let wrapped = ChatError::reply("chat_agent", &inner);
        let rendered = wrapped.to_string();
        assert!(rendered.starts_with("Error generating response in chat_agent:"));
        assert!(rendered.contains("rate limited"));
    }

    #[test]
    fn test_missing_target_message() {
        assert_eq!(
            ChatError::NoLiveMessage.to_string(),
            "operation has no target to update"
        );
    }
}
