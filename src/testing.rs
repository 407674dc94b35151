//! Test doubles for the capability traits.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::oneshot;

use crate::ai::{CommandInterpreter, Interpretation};
use crate::core::event::CalendarEvent;
use crate::error::{AssistantError, Result};
use crate::orchestrator::Launcher;
use crate::scheduler::Clock;

enum Scripted {
    Ready(Result<Interpretation>),
    Gated(oneshot::Receiver<()>, Result<Interpretation>),
}

/// Replays queued results in call order and records every request.
#[derive(Default)]
pub struct ScriptedInterpreter {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<(String, Vec<CalendarEvent>)>>,
}

impl ScriptedInterpreter {
    pub fn push_ok(&self, interpretation: Interpretation) {
        self.push(Scripted::Ready(Ok(interpretation)));
    }

    pub fn push_err(&self, error: AssistantError) {
        self.push(Scripted::Ready(Err(error)));
    }

    /// Queue a reply that is held back until the returned sender fires.
    pub fn push_gated(&self, interpretation: Interpretation) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.push(Scripted::Gated(rx, Ok(interpretation)));
        tx
    }

    fn push(&self, entry: Scripted) {
        self.script.lock().unwrap().push_back(entry);
    }

    pub fn calls(&self) -> Vec<(String, Vec<CalendarEvent>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CommandInterpreter for ScriptedInterpreter {
    async fn interpret(
        &self,
        free_text: &str,
        current_events: &[CalendarEvent],
    ) -> Result<Interpretation> {
        self.calls
            .lock()
            .unwrap()
            .push((free_text.to_string(), current_events.to_vec()));
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Ready(result)) => result,
            Some(Scripted::Gated(gate, result)) => {
                let _ = gate.await;
                result
            }
            None => Err(AssistantError::Request("no scripted reply".into())),
        }
    }
}

#[derive(Default)]
pub struct RecordingLauncher {
    launched: Mutex<Vec<String>>,
}

impl RecordingLauncher {
    pub fn launched(&self) -> Vec<String> {
        self.launched.lock().unwrap().clone()
    }
}

impl Launcher for RecordingLauncher {
    fn launch(&self, uri: &str) {
        self.launched.lock().unwrap().push(uri.to_string());
    }
}

/// Clock whose time is set by the test.
pub struct FixedClock(Mutex<NaiveDateTime>);

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.0.lock().unwrap()
    }
}
