use thiserror::Error;

/// Text shown in the chat when a failure carries no message of its own.
pub const GENERIC_FAILURE: &str = "Ho riscontrato un problema. Riprova.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error("API request failed: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse model reply: {0}")]
    Parse(String),

    #[error("No text in API response")]
    EmptyResponse,

    #[error("No Anthropic API key configured (set ANTHROPIC_API_KEY or run lucy-key)")]
    MissingApiKey,

    #[error("Keyring error: {0}")]
    Keyring(String),

    #[error("Speech recognizer error: {0}")]
    Recognizer(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl AssistantError {
    /// Human-readable text for the chat panel. Never empty.
    pub fn user_message(&self) -> String {
        let detail_missing = match self {
            Self::Request(m)
            | Self::Parse(m)
            | Self::Keyring(m)
            | Self::Recognizer(m)
            | Self::Config(m) => m.trim().is_empty(),
            Self::Api { .. } | Self::EmptyResponse | Self::MissingApiKey => false,
        };
        if detail_missing {
            GENERIC_FAILURE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl From<reqwest::Error> for AssistantError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.to_string())
    }
}

impl From<serde_json::Error> for AssistantError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AssistantError>;
