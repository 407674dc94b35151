//! Wake-word voice input.
//!
//! The recognizer itself is an external program: anything that prints
//! recognized utterances on stdout, one per line. Lines starting with
//! `partial:` are interim hypotheses and only update the live transcript.

use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;

use crate::error::{AssistantError, Result};

const EVENT_CAPACITY: usize = 32;
const PARTIAL_PREFIX: &str = "partial:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceEvent {
    Listening(bool),
    /// Live text of the utterance being recognized.
    Transcript(String),
    /// Text spoken after the wake word.
    Command(String),
}

/// Capability the application needs from a speech recognizer.
#[async_trait]
pub trait SpeechInput: Send + Sync {
    fn is_listening(&self) -> bool;
    fn transcript(&self) -> String;
    fn set_trigger_word(&self, word: &str);
    fn subscribe(&self) -> broadcast::Receiver<VoiceEvent>;
    async fn start(&self) -> Result<()>;
    async fn stop(&self);
}

/// Finds the wake word in an utterance and returns what follows it.
pub struct WakeWordFilter {
    pattern: Option<Regex>,
}

impl WakeWordFilter {
    pub fn new(trigger_word: &str) -> Self {
        let word = trigger_word.trim();
        let pattern = if word.is_empty() {
            None
        } else {
            Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).ok()
        };
        Self { pattern }
    }

    /// Command text after the first wake word, or `None` if there is none.
    /// With an empty wake word every utterance is a command.
    pub fn extract(&self, utterance: &str) -> Option<String> {
        let rest = match &self.pattern {
            Some(re) => &utterance[re.find(utterance)?.end()..],
            None => utterance,
        };
        let command = rest
            .trim_start_matches(|c: char| c.is_whitespace() || c.is_ascii_punctuation())
            .trim_end();
        if command.is_empty() {
            None
        } else {
            Some(command.to_string())
        }
    }
}

struct Shared {
    listening: AtomicBool,
    transcript: watch::Sender<String>,
    trigger: watch::Sender<String>,
    events: broadcast::Sender<VoiceEvent>,
}

impl Shared {
    fn new(trigger_word: &str) -> Self {
        let (transcript, _) = watch::channel(String::new());
        let (trigger, _) = watch::channel(trigger_word.trim().to_lowercase());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            listening: AtomicBool::new(false),
            transcript,
            trigger,
            events,
        }
    }

    fn emit(&self, event: VoiceEvent) {
        let _ = self.events.send(event);
    }

    fn set_listening(&self, listening: bool) {
        if self.listening.swap(listening, Ordering::SeqCst) != listening {
            self.emit(VoiceEvent::Listening(listening));
        }
    }

    fn set_transcript(&self, text: &str) {
        self.transcript.send_replace(text.to_string());
        self.emit(VoiceEvent::Transcript(text.to_string()));
    }

    fn handle_line(&self, line: &str) {
        if let Some(partial) = line.strip_prefix(PARTIAL_PREFIX) {
            self.set_transcript(partial.trim());
            return;
        }

        let utterance = line.trim();
        if utterance.is_empty() {
            return;
        }
        self.set_transcript(utterance);

        let filter = WakeWordFilter::new(&self.trigger.borrow());
        if let Some(command) = filter.extract(utterance) {
            log::info!("Wake word heard, command: {:?}", command);
            self.emit(VoiceEvent::Command(command));
        } else {
            log::debug!("Utterance without wake word ignored");
        }
    }

    async fn pump<R: AsyncBufRead + Unpin>(&self, reader: R) -> std::io::Result<()> {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            self.handle_line(&line);
        }
        Ok(())
    }
}

/// Runs `recognizer_command` through `sh -c` and reads its stdout.
pub struct ProcessSpeechInput {
    command: String,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ProcessSpeechInput {
    pub fn new(command: impl Into<String>, trigger_word: &str) -> Self {
        Self {
            command: command.into(),
            shared: Arc::new(Shared::new(trigger_word)),
            task: Mutex::new(None),
        }
    }
}

#[async_trait]
impl SpeechInput for ProcessSpeechInput {
    fn is_listening(&self) -> bool {
        self.shared.listening.load(Ordering::SeqCst)
    }

    fn transcript(&self) -> String {
        self.shared.transcript.borrow().clone()
    }

    fn set_trigger_word(&self, word: &str) {
        self.shared.trigger.send_replace(word.trim().to_lowercase());
    }

    fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.shared.events.subscribe()
    }

    async fn start(&self) -> Result<()> {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|t| !t.is_finished()) {
            return Ok(());
        }

        let mut child = tokio::process::Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AssistantError::Recognizer(format!("{}: {}", self.command, e)))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AssistantError::Recognizer("recognizer has no stdout".into()))?;

        log::info!("Speech recognizer started: {}", self.command);
        let shared = Arc::clone(&self.shared);
        shared.set_listening(true);

        *task = Some(tokio::spawn(async move {
            if let Err(e) = shared.pump(BufReader::new(stdout)).await {
                log::error!("Reading recognizer output failed: {}", e);
            }
            // Dropping the child on abort kills it; here it ended on its own.
            let _ = child.wait().await;
            shared.set_listening(false);
            log::info!("Speech recognizer exited");
        }));

        Ok(())
    }

    async fn stop(&self) {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
            log::info!("Speech recognizer stopped");
        }
        self.shared.set_listening(false);
        self.shared.set_transcript("");
    }
}
