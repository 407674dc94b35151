pub mod anthropic;
pub mod keyring;

use async_trait::async_trait;
use serde::Deserialize;

use crate::core::event::CalendarEvent;
use crate::error::Result;

/// What the model made of a free-text request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interpretation {
    pub response_text: String,
    /// The complete desired event list, when the request changed the calendar.
    #[serde(default)]
    pub updated_events: Option<Vec<CalendarEvent>>,
}

impl Interpretation {
    pub fn reply(text: impl Into<String>) -> Self {
        Self {
            response_text: text.into(),
            updated_events: None,
        }
    }

    pub fn with_events(text: impl Into<String>, events: Vec<CalendarEvent>) -> Self {
        Self {
            response_text: text.into(),
            updated_events: Some(events),
        }
    }
}

/// Natural-language oracle behind the orchestrator and the daily summary.
#[async_trait]
pub trait CommandInterpreter: Send + Sync {
    async fn interpret(
        &self,
        free_text: &str,
        current_events: &[CalendarEvent],
    ) -> Result<Interpretation>;
}
