use lucy::session::SessionUpdate;
use lucy::voice::VoiceEvent;

/// Everything the terminal loop reacts to.
#[derive(Debug, Clone)]
pub enum Message {
    /// A line typed at the prompt.
    Input(String),
    /// Stdin reached end of file.
    InputClosed,
    Session(SessionUpdate),
    /// Session updates were dropped; reprint from the log.
    Resync,
    Voice(VoiceEvent),
}
