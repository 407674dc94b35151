/// Flags and settings shared between the core and the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    /// True while an interpreter call is in flight.
    pub is_loading: bool,
    /// Wake word, compared case-insensitively.
    pub trigger_word: String,
    /// "HH:mm", 24-hour.
    pub summary_time: String,
    /// Mirrors the speech adapter.
    pub is_listening: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            is_loading: false,
            trigger_word: "lucy".to_string(),
            summary_time: "08:00".to_string(),
            is_listening: false,
        }
    }
}
