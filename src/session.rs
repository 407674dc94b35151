//! Session-scoped state: event store, conversation log and app flags.
//!
//! Every mutation goes through [`Session`] and is broadcast as a
//! [`SessionUpdate`] so the presentation layer can redraw.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast};

use crate::core::event::CalendarEvent;
use crate::core::message::{ChatMessage, GREETING, Sender};
use crate::core::state::AppState;

const UPDATE_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub enum SessionUpdate {
    MessageAppended(ChatMessage),
    EventsReplaced(Vec<CalendarEvent>),
    LoadingChanged(bool),
    ListeningChanged(bool),
    TriggerWordChanged(String),
    SummaryTimeChanged(String),
}

#[derive(Debug, Default)]
struct SessionState {
    events: Vec<CalendarEvent>,
    messages: Vec<ChatMessage>,
    app: AppState,
}

/// Cheap to clone; all clones share the same state.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl Session {
    pub fn new(app: AppState, events: Vec<CalendarEvent>) -> Self {
        Self::from_parts(app, events, Vec::new())
    }

    /// A session that opens with Lucy's greeting.
    pub fn with_greeting(app: AppState, events: Vec<CalendarEvent>) -> Self {
        Self::from_parts(app, events, vec![ChatMessage::assistant(GREETING)])
    }

    fn from_parts(app: AppState, events: Vec<CalendarEvent>, messages: Vec<ChatMessage>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(SessionState {
                events,
                messages,
                app,
            })),
            updates,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    fn publish(&self, update: SessionUpdate) {
        // No receivers is fine: nothing is rendering.
        let _ = self.updates.send(update);
    }

    pub async fn push_message(&self, sender: Sender, text: impl Into<String>) -> ChatMessage {
        let mut state = self.state.lock().await;
        // Id taken under the lock so id order is log order.
        let message = ChatMessage::new(sender, text);
        state.messages.push(message.clone());
        // Published under the lock so subscribers see the log order.
        self.publish(SessionUpdate::MessageAppended(message.clone()));
        message
    }

    /// Replace the whole event list. There is no partial update.
    pub async fn replace_events(&self, events: Vec<CalendarEvent>) {
        let mut state = self.state.lock().await;
        state.events = events.clone();
        self.publish(SessionUpdate::EventsReplaced(events));
    }

    pub async fn set_loading(&self, loading: bool) {
        let mut state = self.state.lock().await;
        state.app.is_loading = loading;
        self.publish(SessionUpdate::LoadingChanged(loading));
    }

    pub async fn set_listening(&self, listening: bool) {
        let mut state = self.state.lock().await;
        if state.app.is_listening == listening {
            return;
        }
        state.app.is_listening = listening;
        self.publish(SessionUpdate::ListeningChanged(listening));
    }

    pub async fn set_trigger_word(&self, word: &str) {
        let word = word.trim().to_lowercase();
        let mut state = self.state.lock().await;
        state.app.trigger_word = word.clone();
        self.publish(SessionUpdate::TriggerWordChanged(word));
    }

    pub async fn set_summary_time(&self, time: &str) {
        let time = time.trim().to_string();
        let mut state = self.state.lock().await;
        state.app.summary_time = time.clone();
        self.publish(SessionUpdate::SummaryTimeChanged(time));
    }

    pub async fn events(&self) -> Vec<CalendarEvent> {
        self.state.lock().await.events.clone()
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    pub async fn app_state(&self) -> AppState {
        self.state.lock().await.app.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn greeting_is_the_first_message() {
        let session = Session::with_greeting(AppState::default(), Vec::new());
        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].sender, Sender::Assistant);
        assert_eq!(messages[0].text, GREETING);
    }

    #[tokio::test]
    async fn mutations_are_broadcast_in_order() {
        let session = Session::new(AppState::default(), Vec::new());
        let mut rx = session.subscribe();

        session.push_message(Sender::User, "ciao").await;
        session.set_loading(true).await;
        session.replace_events(Vec::new()).await;

        assert!(matches!(rx.recv().await.unwrap(), SessionUpdate::MessageAppended(m) if m.text == "ciao"));
        assert!(matches!(rx.recv().await.unwrap(), SessionUpdate::LoadingChanged(true)));
        assert!(matches!(rx.recv().await.unwrap(), SessionUpdate::EventsReplaced(e) if e.is_empty()));
    }

    #[tokio::test]
    async fn trigger_word_is_stored_lowercase() {
        let session = Session::new(AppState::default(), Vec::new());
        session.set_trigger_word("  Jarvis ").await;
        assert_eq!(session.app_state().await.trigger_word, "jarvis");
    }

    #[tokio::test]
    async fn concurrent_loading_toggles_arrive_in_state_order() {
        let session = Session::new(AppState::default(), Vec::new());
        let mut rx = session.subscribe();

        let tasks: Vec<_> = (0..50)
            .map(|i| {
                let session = session.clone();
                tokio::spawn(async move { session.set_loading(i % 2 == 0).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let mut last = None;
        while let Ok(SessionUpdate::LoadingChanged(loading)) = rx.try_recv() {
            last = Some(loading);
        }
        assert_eq!(last, Some(session.app_state().await.is_loading));
    }

    #[tokio::test]
    async fn message_ids_follow_log_order() {
        let session = Session::new(AppState::default(), Vec::new());
        let tasks: Vec<_> = (0..20)
            .map(|i| {
                let session = session.clone();
                tokio::spawn(async move { session.push_message(Sender::User, format!("m{}", i)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let messages = session.messages().await;
        assert!(messages.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn listening_change_is_published_once() {
        let session = Session::new(AppState::default(), Vec::new());
        let mut rx = session.subscribe();
        session.set_listening(true).await;
        session.set_listening(true).await;
        session.set_loading(false).await;

        assert!(matches!(rx.recv().await.unwrap(), SessionUpdate::ListeningChanged(true)));
        assert!(matches!(rx.recv().await.unwrap(), SessionUpdate::LoadingChanged(false)));
    }
}
