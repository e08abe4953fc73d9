//! Agent pipeline: thread-based conversations against the stateful agent
//! service, with tool-augmented runs, streamed deltas, and citation
//! reconciliation over the finalized message's annotations.
pub mod content;
pub mod events;
pub mod http;
pub mod pipeline;
pub mod service;

#[cfg(test)]
pub mod mock;

/// Provider segment of chat profiles served by the agent pipeline
pub const AGENT_PROVIDER: &str = "agents";
