use serde::{Deserialize, Serialize};

/// Environment variable holding the model list as a JSON array (production)
pub const LLM_CONFIG_ENV: &str = "LLM_CONFIG";

/// Fallback configuration file used in development
pub const LLM_CONFIG_FILE: &str = "llm_config/llm_config.json";

/// One selectable backend from the external configuration list
///
/// `model_deployment` is the slash-separated `provider/name` pair shown as a
/// chat profile. The optional fields are only present where the backend
/// needs them: hosted providers carry an api key, azure deployments carry an
/// endpoint and api version, agent profiles carry the agent identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub model_deployment: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Agent identifier for profiles served by the agent service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
}

impl ModelConfig {
    /// The `provider` half of the deployment pair
    pub fn provider(&self) -> &str {
        self.model_deployment
            .split_once('/')
            .map(|(provider, _)| provider)
            .unwrap_or(&self.model_deployment)
    }

    /// The `name` half of the deployment pair
    pub fn model_name(&self) -> &str {
        self.model_deployment
            .split_once('/')
            .map(|(_, name)| name)
            .unwrap_or("")
    }
}

/// Load the model list, preferring the environment variable over the file
///
/// The list is intentionally re-read on every call so configuration changes
/// take effect without a restart. Unusable sources degrade to an empty list;
/// lookups against an empty list yield an empty descriptor and the backend
/// call is what fails.
pub fn load_model_configs() -> Vec<ModelConfig> {
    if let Ok(raw) = std::env::var(LLM_CONFIG_ENV) {
        if !raw.trim().is_empty() {
            match serde_json::from_str(&raw) {
                Ok(configs) => return configs,
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", LLM_CONFIG_ENV, e);
                }
            }
        }
    }

    match std::fs::read_to_string(LLM_CONFIG_FILE) {
        Ok(raw) => match serde_json::from_str(&raw) {
            Ok(configs) => configs,
            Err(e) => {
                tracing::warn!("Failed to parse {}: {}", LLM_CONFIG_FILE, e);
                Vec::new()
            }
        },
        Err(e) => {
            tracing::warn!("No model configuration available: {}", e);
            Vec::new()
        }
    }
}

/// Find a model by exact deployment match against the selected profile
pub fn find_by_deployment<'a>(
    configs: &'a [ModelConfig],
    profile: &str,
) -> Option<&'a ModelConfig> {
    configs
        .iter()
        .find(|config| config.model_deployment == profile)
}

/// Find a model whose deployment ends in `/name`
pub fn find_by_model_suffix<'a>(
    configs: &'a [ModelConfig],
    model_name: &str,
) -> Option<&'a ModelConfig> {
    let suffix = format!("/{model_name}");
    configs
        .iter()
        .find(|config| config.model_deployment.ends_with(&suffix))
}
