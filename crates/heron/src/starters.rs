use serde::{Deserialize, Serialize};

/// A pre-configured conversation starter shown on the empty chat screen
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Starter {
    pub label: String,
    pub message: String,
    pub icon: String,
}

impl Starter {
    fn new(label: &str, message: &str, icon: &str) -> Self {
        Self {
            label: label.to_string(),
            message: message.to_string(),
            icon: icon.to_string(),
        }
    }
}

/// The static starter prompts offered to new conversations
pub fn starters() -> Vec<Starter> {
    vec![
        Starter::new(
            "Morning routine ideation",
            "Can you help me create a personalized morning routine that would help increase my productivity throughout the day? Start by asking me about my current habits and what activities energize me in the morning.",
            "/public/bulb.webp",
        ),
        Starter::new(
            "Spot the errors",
            "How can I avoid common mistakes when proofreading my work?",
            "/public/warning.webp",
        ),
        Starter::new(
            "Get more done",
            "How can I improve my productivity during remote work?",
            "/public/rocket.png",
        ),
        Starter::new(
            "Boost your knowledge",
            "Help me learn about [topic]",
            "/public/book.png",
        ),
    ]
}
