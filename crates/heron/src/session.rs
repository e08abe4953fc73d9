use std::collections::HashMap;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::message::Message;
use crate::settings::ChatSettings;

/// Session keys owned by the chat surface
pub mod keys {
    pub const CHAT_SETTINGS: &str = "chat_settings";
    pub const CHAT_PROFILE: &str = "chat_profile";
    pub const CHAT_HISTORY: &str = "chat_history";
    pub const FILE_UPLOADS: &str = "file_uploads";
    pub const FILE_CONTENTS: &str = "file_contents";
    pub const THREAD_ID: &str = "thread_id";
    pub const FILE_ID_MAPPING: &str = "file_id_mapping";
}

/// Opaque key-value store owned by the UI framework
///
/// Missing keys read as `None`; callers fall back to defaults. The core
/// only touches the store at turn boundaries through `TurnContext`.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
}

fn get_or_default<T: DeserializeOwned + Default>(store: &dyn SessionStore, key: &str) -> T {
    store
        .get(key)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

/// A pending attachment recorded when the user message was appended
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileUpload {
    pub name: String,
    pub mime: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
}

/// Per-turn context snapshot
///
/// Built once from the session store when a turn starts and written back
/// when it ends. The pipelines receive this instead of reaching into
/// ambient session state; the only mutation between boundaries is by the
/// single in-flight turn.
pub struct TurnContext<'a> {
    store: &'a dyn SessionStore,
    pub settings: ChatSettings,
    pub profile: String,
    pub chat_history: Vec<Message>,
    pub file_uploads: Vec<FileUpload>,
    pub file_contents: Vec<String>,
    pub thread_id: Option<String>,
    pub file_id_names: HashMap<String, String>,
    started: Instant,
}

impl<'a> TurnContext<'a> {
    /// Snapshot the session at the start of a turn
    pub fn begin(store: &'a dyn SessionStore) -> Self {
        let mut settings: ChatSettings = get_or_default(store, keys::CHAT_SETTINGS);
        let profile: String = get_or_default(store, keys::CHAT_PROFILE);
        if !profile.is_empty() {
            settings.select_profile(&profile);
        }

        Self {
            store,
            settings,
            profile,
            chat_history: get_or_default(store, keys::CHAT_HISTORY),
            file_uploads: get_or_default(store, keys::FILE_UPLOADS),
            file_contents: get_or_default(store, keys::FILE_CONTENTS),
            thread_id: {
                let thread_id: String = get_or_default(store, keys::THREAD_ID);
                (!thread_id.is_empty()).then_some(thread_id)
            },
            file_id_names: get_or_default(store, keys::FILE_ID_MAPPING),
            started: Instant::now(),
        }
    }

    /// Seconds since the turn started
    pub fn elapsed_seconds(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }

    /// Write the mutated state back to the session store
    pub fn finish(self) {
        let store = self.store;
        if let Ok(value) = serde_json::to_value(&self.settings) {
            store.set(keys::CHAT_SETTINGS, value);
        }
        if let Ok(value) = serde_json::to_value(&self.chat_history) {
            store.set(keys::CHAT_HISTORY, value);
        }
        if let Ok(value) = serde_json::to_value(&self.file_uploads) {
            store.set(keys::FILE_UPLOADS, value);
        }
        if let Ok(value) = serde_json::to_value(&self.file_contents) {
            store.set(keys::FILE_CONTENTS, value);
        }
        if let Some(thread_id) = &self.thread_id {
            store.set(keys::THREAD_ID, Value::String(thread_id.clone()));
        }
        if let Ok(value) = serde_json::to_value(&self.file_id_names) {
            store.set(keys::FILE_ID_MAPPING, value);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// In-memory store for unit tests
    #[derive(Default)]
    pub struct MemoryStore {
        values: Mutex<HashMap<String, Value>>,
    }

    impl SessionStore for MemoryStore {
        fn get(&self, key: &str) -> Option<Value> {
            self.values.lock().unwrap().get(key).cloned()
        }

        fn set(&self, key: &str, value: Value) {
            self.values.lock().unwrap().insert(key.to_string(), value);
        }
    }

    #[test]
    fn test_begin_defaults_on_empty_store() {
        let store = MemoryStore::default();
        let ctx = TurnContext::begin(&store);
        assert_eq!(ctx.settings.temperature, 0.7);
        assert!(ctx.profile.is_empty());
        assert!(ctx.chat_history.is_empty());
        assert!(ctx.thread_id.is_none());
    }

    #[test]
    fn test_begin_applies_selected_profile() {
        let store = MemoryStore::default();
        store.set(keys::CHAT_PROFILE, Value::String("azure/gpt-4o".into()));
        let ctx = TurnContext::begin(&store);
        assert_eq!(ctx.settings.model_provider, "azure");
        assert_eq!(ctx.settings.model_name, "gpt-4o");
    }

    #[test]
    fn test_finish_persists_mutations() {
        let store = MemoryStore::default();
        let mut ctx = TurnContext::begin(&store);
        ctx.chat_history.push(Message::user().with_text("hi"));
        ctx.thread_id = Some("thread_1".to_string());
        ctx.file_id_names
            .insert("file_1".to_string(), "report.pdf".to_string());
        ctx.finish();

        let ctx = TurnContext::begin(&store);
        assert_eq!(ctx.chat_history.len(), 1);
        assert_eq!(ctx.thread_id.as_deref(), Some("thread_1"));
        assert_eq!(ctx.file_id_names["file_1"], "report.pdf");
    }

    #[test]
    fn test_elapsed_is_monotonic() {
        let store = MemoryStore::default();
        let ctx = TurnContext::begin(&store);
        assert!(ctx.elapsed_seconds() >= 0.0);
    }
}
