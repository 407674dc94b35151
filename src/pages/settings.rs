use chrono::NaiveDate;

use lucy::config::LucyConfig;
use lucy::core::state::AppState;
use lucy::core::summary_time::SummaryTime;

/// A line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Free text for the assistant.
    Command(String),
    Ui(UiCommand),
    /// A `:` command that could not be understood; the string explains why.
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    Help,
    Quit,
    Settings,
    ShowCalendar,
    NextMonth,
    PrevMonth,
    SelectDay(NaiveDate),
    SetTriggerWord(String),
    SetSummaryTime(String),
    Listen,
    StopListening,
}

pub const HELP: &str = "\
Comandi:
  :cal                 mostra il calendario
  :next / :prev        mese successivo / precedente
  :day AAAA-MM-GG      seleziona un giorno
  :trigger <parola>    cambia la parola di attivazione
  :summary HH:mm       orario del riepilogo giornaliero
  :listen / :stop      accendi / spegni il microfono
  :settings            mostra le impostazioni
  :help                questo aiuto
  :quit                esci
Qualsiasi altro testo viene inviato a Lucy.";

pub fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    let Some(rest) = line.strip_prefix(':') else {
        return Some(Input::Command(line.to_string()));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    let ui = match (name.to_lowercase().as_str(), arg) {
        ("help" | "h" | "?", _) => UiCommand::Help,
        ("quit" | "q" | "exit", _) => UiCommand::Quit,
        ("settings", _) => UiCommand::Settings,
        ("cal" | "calendar", _) => UiCommand::ShowCalendar,
        ("next", _) => UiCommand::NextMonth,
        ("prev", _) => UiCommand::PrevMonth,
        ("listen", _) => UiCommand::Listen,
        ("stop", _) => UiCommand::StopListening,
        ("day", raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => UiCommand::SelectDay(date),
            Err(_) => return Some(Input::Invalid(format!("Data non valida: {:?} (usa AAAA-MM-GG)", raw))),
        },
        ("trigger", "") => return Some(Input::Invalid("Specifica una parola di attivazione".into())),
        ("trigger", word) if word.split_whitespace().count() > 1 => {
            return Some(Input::Invalid("La parola di attivazione deve essere una sola parola".into()));
        }
        ("trigger", word) => UiCommand::SetTriggerWord(word.to_lowercase()),
        ("summary", raw) => match SummaryTime::parse(raw) {
            Some(time) => UiCommand::SetSummaryTime(time.to_string()),
            None => return Some(Input::Invalid(format!("Orario non valido: {:?} (usa HH:mm)", raw))),
        },
        (other, _) => return Some(Input::Invalid(format!("Comando sconosciuto: :{} (prova :help)", other))),
    };
    Some(Input::Ui(ui))
}

pub fn settings_view(app: &AppState, config: &LucyConfig) -> String {
    let voice = if config.voice_enabled() {
        config.recognizer_command.as_str()
    } else {
        "(disattivato)"
    };
    format!(
        "Impostazioni\n  parola di attivazione: {}\n  riepilogo giornaliero: {}\n  microfono: {}\n  riconoscitore: {}\n  apertura programmi: {}\n  modello: {}",
        app.trigger_word,
        app.summary_time,
        if app.is_listening { "acceso" } else { "spento" },
        voice,
        config.opener_command,
        config.model,
    )
}
