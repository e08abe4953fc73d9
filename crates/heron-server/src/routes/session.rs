use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use heron::agents::http::HttpAgentService;
use heron::agents::service::AgentService;
use heron::agents::AGENT_PROVIDER;
use heron::config::{find_by_model_suffix, load_model_configs};
use heron::session::{keys, SessionStore};
use heron::settings::ChatSettings;

use crate::auth::user_from_headers;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct StartRequest {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    chat_profile: Option<String>,
}

#[derive(Debug, Serialize)]
struct StartResponse {
    session_id: String,
    thread_id: Option<String>,
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    tracing::error!("Error: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("An error occurred: {err}"),
    )
}

/// Initialize a chat session: settings snapshot, profile selection, and
/// (for agent-backed profiles) the backend conversation thread
async fn start_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<StartRequest>,
) -> Result<Json<StartResponse>, (StatusCode, String)> {
    let user = user_from_headers(&headers).ok_or((
        StatusCode::UNAUTHORIZED,
        "authentication required".to_string(),
    ))?;
    tracing::info!("Session start for {}", user.identifier);

    let session_id = request
        .session_id
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let store = state.session(&session_id);

    let mut settings = ChatSettings::default();
    if let Some(profile) = &request.chat_profile {
        store.set(keys::CHAT_PROFILE, json!(profile));
        settings.select_profile(profile);
    }
    store.set(
        keys::CHAT_SETTINGS,
        serde_json::to_value(&settings).map_err(internal_error)?,
    );

    let mut thread_id = store
        .get(keys::THREAD_ID)
        .and_then(|value| value.as_str().map(str::to_string))
        .filter(|id| !id.is_empty());

    if settings.model_provider == AGENT_PROVIDER && thread_id.is_none() {
        let configs = load_model_configs();
        let llm_details = find_by_model_suffix(&configs, &settings.model_name)
            .cloned()
            .unwrap_or_default();
        let endpoint = llm_details.api_endpoint.clone().ok_or_else(|| {
            internal_error(format!(
                "profile {} has no api endpoint",
                settings.model_name
            ))
        })?;

        let service =
            HttpAgentService::new(endpoint, llm_details.api_key).map_err(internal_error)?;
        let id = service.create_thread().await.map_err(internal_error)?;
        tracing::info!("New thread created, thread ID: {}", id);
        store.set(keys::THREAD_ID, json!(id));
        thread_id = Some(id);
    }

    Ok(Json(StartResponse {
        session_id,
        thread_id,
    }))
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/session/start", post(start_session))
        .with_state(state)
}
