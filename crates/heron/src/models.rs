//! These models represent the objects passed between the chat surface and
//! the LLM backends:
//! - chat messages sent from the interface into a turn, kept in session
//!   history and replayed on every request
//! - the openai-style wire messages sent to the completion providers
//!
//! The internal structs are converted to the wire format at the provider
//! boundary so the rest of the crate never handles raw JSON message lists.
pub mod message;
pub mod role;
