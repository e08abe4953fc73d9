use heron::session::SessionStore;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// In-memory session store, one per chat session
///
/// Implements the core's opaque key-value contract. Values live for the
/// process lifetime; durable session storage is an external concern.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, Value>>,
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        self.values.lock().unwrap().insert(key.to_string(), value);
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Default completion endpoint when a descriptor has no api_base
    pub completions_host: String,
    sessions: Arc<Mutex<HashMap<String, Arc<MemorySessionStore>>>>,
}

impl AppState {
    pub fn new(completions_host: String) -> Self {
        Self {
            completions_host,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Fetch or create the session store for `session_id`
    pub fn session(&self, session_id: &str) -> Arc<MemorySessionStore> {
        self.sessions
            .lock()
            .unwrap()
            .entry(session_id.to_string())
            .or_default()
            .clone()
    }
}
