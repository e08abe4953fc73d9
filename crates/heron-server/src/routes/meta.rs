use axum::{response::Json, routing::get, Router};
use serde::Serialize;

use heron::config::load_model_configs;
use heron::settings::{settings_widgets, InputWidget};
use heron::starters::{starters, Starter};

/// A selectable chat profile derived from the model configuration list
#[derive(Debug, Serialize)]
pub struct ChatProfile {
    pub name: String,
    pub markdown_description: String,
}

async fn get_profiles() -> Json<Vec<ChatProfile>> {
    let profiles = load_model_configs()
        .into_iter()
        .map(|config| ChatProfile {
            name: config.model_deployment,
            markdown_description: config.description,
        })
        .collect();
    Json(profiles)
}

async fn get_starters() -> Json<Vec<Starter>> {
    Json(starters())
}

async fn get_settings() -> Json<Vec<InputWidget>> {
    Json(settings_widgets())
}

pub fn routes() -> Router {
    Router::new()
        .route("/api/profiles", get(get_profiles))
        .route("/api/starters", get(get_starters))
        .route("/api/settings", get(get_settings))
}
