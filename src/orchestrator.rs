//! Routes each command to a local shortcut or to the interpreter and folds
//! the outcome back into the session.

use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::ai::CommandInterpreter;
use crate::core::message::Sender;
use crate::session::Session;

static SHORTCUT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:apri|avvia|open|launch)\s(.+)").unwrap());

/// Hands a `<name>:` URI to the desktop. Fire-and-forget.
pub trait Launcher: Send + Sync {
    fn launch(&self, uri: &str);
}

/// Spawns an opener program (`xdg-open` by default) with the URI.
pub struct CommandLauncher {
    program: String,
}

impl CommandLauncher {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Launcher for CommandLauncher {
    fn launch(&self, uri: &str) {
        if let Err(e) = std::process::Command::new(&self.program).arg(uri).spawn() {
            log::error!("Failed to open {} with {}: {}", uri, self.program, e);
        }
    }
}

/// Program name when `command` is an "apri/avvia/open/launch <name>" shortcut.
pub fn shortcut_target(command: &str) -> Option<String> {
    let lowered = command.to_lowercase();
    let caps = SHORTCUT_RE.captures(&lowered)?;
    let name = caps.get(1)?.as_str().trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[derive(Clone)]
pub struct CommandOrchestrator {
    session: Session,
    interpreter: Arc<dyn CommandInterpreter>,
    launcher: Arc<dyn Launcher>,
}

impl CommandOrchestrator {
    pub fn new(
        session: Session,
        interpreter: Arc<dyn CommandInterpreter>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            session,
            interpreter,
            launcher,
        }
    }

    /// Handle one typed or spoken command. Never fails; problems end up in the chat.
    ///
    /// Concurrent calls are not serialized: each one works on the events it saw
    /// when it started, and the last response to arrive replaces the store.
    pub async fn handle(&self, command: &str) {
        let command = command.trim();
        if command.is_empty() {
            return;
        }

        self.session.push_message(Sender::User, command).await;
        self.session.set_loading(true).await;

        if let Some(name) = shortcut_target(command) {
            log::info!("Shortcut: opening {}", name);
            self.session
                .push_message(Sender::Assistant, format!("Provo ad aprire {}...", name))
                .await;
            self.launcher.launch(&format!("{}:", name));
            self.session.set_loading(false).await;
            return;
        }

        let events = self.session.events().await;
        log::info!("Sending command to interpreter ({} events)", events.len());

        match self.interpreter.interpret(command, &events).await {
            Ok(interpretation) => {
                self.session
                    .push_message(Sender::Assistant, interpretation.response_text)
                    .await;
                if let Some(updated) = interpretation.updated_events {
                    log::info!("Replacing event store with {} events", updated.len());
                    self.session.replace_events(updated).await;
                }
            }
            Err(e) => {
                log::error!("Error processing command: {}", e);
                self.session
                    .push_message(Sender::Assistant, format!("Errore: {}", e.user_message()))
                    .await;
            }
        }

        self.session.set_loading(false).await;
    }
}
