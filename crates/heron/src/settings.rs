use indoc::indoc;
use serde::{Deserialize, Serialize};

/// Default system instructions sent ahead of every conversation
pub const DEFAULT_INSTRUCTIONS: &str = indoc! {"
    You are Heron, a conversational assistant for internal employees.
    Your primary role is to provide accurate, timely, and relevant information,
    support productivity tasks, and help employees work efficiently.

    ### Personality Traits
    - Professional: Maintain a formal and respectful tone.
    - Knowledgeable: Provide accurate, up-to-date information on internal policies and procedures.
    - Supportive: Offer assistance and solutions that promote a collaborative work environment.
    - Efficient: Deliver concise and clear responses.

    ### Safety Guidelines
    - Confidentiality: Protect sensitive information; never share confidential data outside internal operations.
    - Accuracy: Provide verified information. If unsure, say so and point to the right team.
    - Transparency: Tell the user when a request exceeds your capabilities.

    ### Interaction Style
    - Formal and respectful, concise and clear, helpful and supportive.
"};

/// Per-session chat settings
///
/// `model_provider` and `model_name` are derived from the selected chat
/// profile (`provider/name`) when a turn begins; temperature and
/// instructions come from the settings panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSettings {
    pub temperature: f64,
    pub instructions: String,
    #[serde(default)]
    pub model_provider: String,
    #[serde(default)]
    pub model_name: String,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            model_provider: String::new(),
            model_name: String::new(),
        }
    }
}

impl ChatSettings {
    /// Apply a selected `provider/name` profile to the settings snapshot
    pub fn select_profile(&mut self, profile: &str) {
        if let Some((provider, name)) = profile.split_once('/') {
            self.model_provider = provider.to_string();
            self.model_name = name.to_string();
        } else {
            self.model_provider = profile.to_string();
            self.model_name = String::new();
        }
    }
}

/// Declarative settings-panel widgets rendered by the chat surface
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputWidget {
    Slider {
        id: String,
        label: String,
        initial: f64,
        min: f64,
        max: f64,
        step: f64,
    },
    TextInput {
        id: String,
        label: String,
        initial: String,
    },
}

/// The settings widgets offered to the user
pub fn settings_widgets() -> Vec<InputWidget> {
    vec![
        InputWidget::Slider {
            id: "temperature".to_string(),
            label: "Temperature".to_string(),
            initial: 0.7,
            min: 0.0,
            max: 2.0,
            step: 0.1,
        },
        InputWidget::TextInput {
            id: "instructions".to_string(),
            label: "Instructions".to_string(),
            initial: DEFAULT_INSTRUCTIONS.to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ChatSettings::default();
        assert_eq!(settings.temperature, 0.7);
        assert!(settings.instructions.contains("Heron"));
        assert!(settings.model_provider.is_empty());
    }

    #[test]
    fn test_select_profile_splits_provider_and_name() {
        let mut settings = ChatSettings::default();
        settings.select_profile("azure/gpt-4o");
        assert_eq!(settings.model_provider, "azure");
        assert_eq!(settings.model_name, "gpt-4o");
    }

    #[test]
    fn test_select_profile_without_slash() {
        let mut settings = ChatSettings::default();
        settings.select_profile("ollama");
        assert_eq!(settings.model_provider, "ollama");
        assert_eq!(settings.model_name, "");
    }

    #[test]
    fn test_widget_declarations() {
        let widgets = settings_widgets();
        assert_eq!(widgets.len(), 2);
        match &widgets[0] {
            InputWidget::Slider { id, min, max, step, .. } => {
                assert_eq!(id, "temperature");
                assert_eq!(*min, 0.0);
                assert_eq!(*max, 2.0);
                assert_eq!(*step, 0.1);
            }
            other => panic!("expected slider, got {other:?}"),
        }
    }
}
