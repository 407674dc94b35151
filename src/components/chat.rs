use lucy::core::message::ChatMessage;
use uuid::Uuid;

/// One chat bubble: sender label, continuation lines indented under the text.
pub fn chat_message(message: &ChatMessage) -> String {
    let label = format!("{}: ", message.sender.label());
    let indent = " ".repeat(label.chars().count());
    let mut out = String::new();

    for (i, line) in message.text.lines().enumerate() {
        if i == 0 {
            out.push_str(&label);
        } else {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
            }
        }
        out.push_str(line);
    }

    if out.is_empty() {
        out.push_str(label.trim_end());
    }
    out
}

/// Messages logged after `last_shown`. Ids are time-ordered, so this is a suffix of the log.
pub fn unseen(messages: &[ChatMessage], last_shown: Option<Uuid>) -> &[ChatMessage] {
    match last_shown {
        Some(id) => {
            let start = messages.partition_point(|m| m.id <= id);
            &messages[start..]
        }
        None => messages,
    }
}

pub fn thinking_indicator() -> &'static str {
    "Lucy sta pensando..."
}

pub fn transcript_line(transcript: &str) -> String {
    format!("(mic) {}", transcript)
}

pub fn listening_status(listening: bool, trigger_word: &str) -> String {
    if listening {
        format!("In ascolto... di' \"{}\" seguito dal comando.", trigger_word)
    } else {
        "Microfono spento.".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line_message() {
        assert_eq!(chat_message(&ChatMessage::user("apri spotify")), "Tu: apri spotify");
    }

    #[test]
    fn multi_line_message_is_indented() {
        let msg = ChatMessage::assistant("Ecco il tuo riepilogo:\n\nTre riunioni.");
        assert_eq!(
            chat_message(&msg),
            "Lucy: Ecco il tuo riepilogo:\n\n      Tre riunioni."
        );
    }

    #[test]
    fn unseen_skips_what_was_already_printed() {
        let log = vec![
            ChatMessage::user("uno"),
            ChatMessage::assistant("due"),
            ChatMessage::user("tre"),
        ];
        assert_eq!(unseen(&log, None).len(), 3);
        let rest = unseen(&log, Some(log[0].id));
        assert_eq!(rest.len(), 2);
        assert_eq!(rest[0].text, "due");
        assert!(unseen(&log, Some(log[2].id)).is_empty());
    }

    #[test]
    fn listening_status_names_the_wake_word() {
        assert!(listening_status(true, "lucy").contains("\"lucy\""));
        assert_eq!(listening_status(false, "lucy"), "Microfono spento.");
    }
}
