use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast;
use uuid::Uuid;

use lucy::ai::CommandInterpreter;
use lucy::ai::anthropic::AnthropicInterpreter;
use lucy::config::LucyConfig;
use lucy::core::event::sample_events;
use lucy::core::message::ChatMessage;
use lucy::core::state::AppState;
use lucy::orchestrator::{CommandLauncher, CommandOrchestrator};
use lucy::scheduler::DailySummaryScheduler;
use lucy::session::{Session, SessionUpdate};
use lucy::voice::{ProcessSpeechInput, SpeechInput, VoiceEvent};

use crate::components::chat;
use crate::components::month_calendar::{MonthCalendarState, month_calendar};
use crate::message::Message;
use crate::pages::settings::{self, Input, UiCommand};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchMode {
    pub voice: bool,
    pub summary: bool,
}

pub struct Flags {
    pub config: LucyConfig,
    pub config_path: PathBuf,
    pub launch_mode: LaunchMode,
}

pub struct Lucy {
    config: LucyConfig,
    config_path: PathBuf,
    session: Session,
    orchestrator: CommandOrchestrator,
    scheduler: DailySummaryScheduler,
    voice: Option<Arc<dyn SpeechInput>>,
    month_calendar: MonthCalendarState,
    /// Newest chat message already printed.
    last_shown: Option<Uuid>,
}

impl Lucy {
    pub async fn init(flags: Flags) -> Self {
        let Flags {
            config,
            config_path,
            launch_mode,
        } = flags;

        let today = Local::now().date_naive();
        let events = if config.seed_sample_events {
            sample_events(today)
        } else {
            Vec::new()
        };
        let app_state = AppState {
            trigger_word: config.trigger_word.to_lowercase(),
            summary_time: config.summary_time.clone(),
            ..AppState::default()
        };
        let session = Session::with_greeting(app_state, events);

        let interpreter: Arc<dyn CommandInterpreter> =
            Arc::new(AnthropicInterpreter::from_environment(config.model.clone()).await);
        let launcher = Arc::new(CommandLauncher::new(config.opener_command.clone()));
        let orchestrator =
            CommandOrchestrator::new(session.clone(), Arc::clone(&interpreter), launcher);

        let mut scheduler =
            DailySummaryScheduler::new(session.clone(), interpreter, config.summary_time.clone());
        if launch_mode.summary {
            scheduler.start();
        }

        let voice: Option<Arc<dyn SpeechInput>> = if config.voice_enabled() {
            Some(Arc::new(ProcessSpeechInput::new(
                config.recognizer_command.clone(),
                &config.trigger_word,
            )) as Arc<dyn SpeechInput>)
        } else {
            None
        };

        let app = Self {
            config,
            config_path,
            session,
            orchestrator,
            scheduler,
            voice,
            month_calendar: MonthCalendarState::new(today),
            last_shown: None,
        };

        if launch_mode.voice {
            app.start_listening().await;
        }

        app
    }

    pub async fn run(mut self) {
        let mut updates = self.session.subscribe();
        let mut voice_events = self.voice.as_ref().map(|v| v.subscribe());
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        self.show_unseen_messages().await;
        self.show_calendar().await;
        println!("(:help per i comandi)");

        loop {
            let message = tokio::select! {
                line = lines.next_line() => match line {
                    Ok(Some(line)) => Message::Input(line),
                    Ok(None) => Message::InputClosed,
                    Err(e) => {
                        log::error!("Failed to read stdin: {}", e);
                        Message::InputClosed
                    }
                },
                update = updates.recv() => match update {
                    Ok(update) => Message::Session(update),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        log::warn!("Display fell behind by {} updates", n);
                        Message::Resync
                    }
                    Err(broadcast::error::RecvError::Closed) => Message::InputClosed,
                },
                event = next_voice_event(&mut voice_events) => match event {
                    Some(event) => Message::Voice(event),
                    None => {
                        voice_events = None;
                        continue;
                    }
                },
            };

            if !self.update(message).await {
                break;
            }
        }

        self.scheduler.stop();
        if let Some(voice) = &self.voice {
            voice.stop().await;
        }
        log::info!("Session ended");
    }

    /// Returns false when the app should quit.
    async fn update(&mut self, message: Message) -> bool {
        match message {
            Message::Input(line) => match settings::parse_input(&line) {
                Some(Input::Command(command)) => self.dispatch(command),
                Some(Input::Ui(UiCommand::Quit)) => return false,
                Some(Input::Ui(ui)) => self.update_ui(ui).await,
                Some(Input::Invalid(reason)) => println!("{}", reason),
                None => {}
            },

            Message::InputClosed => return false,

            Message::Session(update) => self.on_session_update(update).await,

            Message::Resync => {
                self.show_unseen_messages().await;
                self.show_calendar().await;
            }

            Message::Voice(VoiceEvent::Command(command)) => self.dispatch(command),
            Message::Voice(VoiceEvent::Listening(listening)) => {
                self.session.set_listening(listening).await;
            }
            Message::Voice(VoiceEvent::Transcript(transcript)) => {
                if !transcript.is_empty() {
                    println!("{}", chat::transcript_line(&transcript));
                }
            }
        }
        true
    }

    /// Run a command on its own task so the prompt stays responsive.
    fn dispatch(&self, command: String) {
        let orchestrator = self.orchestrator.clone();
        tokio::spawn(async move { orchestrator.handle(&command).await });
    }

    async fn update_ui(&mut self, ui: UiCommand) {
        match ui {
            UiCommand::Help => println!("{}", settings::HELP),
            UiCommand::Quit => {}
            UiCommand::Settings => {
                let app = self.session.app_state().await;
                println!("{}", settings::settings_view(&app, &self.config));
            }
            UiCommand::ShowCalendar => self.show_calendar().await,
            UiCommand::NextMonth => {
                self.month_calendar.next_month();
                self.show_calendar().await;
            }
            UiCommand::PrevMonth => {
                self.month_calendar.prev_month();
                self.show_calendar().await;
            }
            UiCommand::SelectDay(date) => {
                self.month_calendar.select_day(date);
                self.show_calendar().await;
            }
            UiCommand::SetTriggerWord(word) => {
                if let Some(voice) = &self.voice {
                    voice.set_trigger_word(&word);
                }
                self.session.set_trigger_word(&word).await;
                self.config.trigger_word = word;
                self.save_config();
            }
            UiCommand::SetSummaryTime(time) => {
                self.scheduler.reconfigure(&time).await;
                self.session.set_summary_time(&time).await;
                self.config.summary_time = time;
                self.save_config();
            }
            UiCommand::Listen => self.start_listening().await,
            UiCommand::StopListening => {
                if let Some(voice) = &self.voice {
                    voice.stop().await;
                }
            }
        }
    }

    async fn on_session_update(&mut self, update: SessionUpdate) {
        match update {
            SessionUpdate::MessageAppended(message) => self.show_message(&message),
            SessionUpdate::EventsReplaced(_) => {
                self.scheduler.restart();
                self.show_calendar().await;
            }
            SessionUpdate::LoadingChanged(true) => println!("{}", chat::thinking_indicator()),
            SessionUpdate::LoadingChanged(false) => {}
            SessionUpdate::ListeningChanged(listening) => {
                let app = self.session.app_state().await;
                println!("{}", chat::listening_status(listening, &app.trigger_word));
            }
            SessionUpdate::TriggerWordChanged(word) => {
                println!("Parola di attivazione impostata su \"{}\".", word);
            }
            SessionUpdate::SummaryTimeChanged(time) => {
                println!("Riepilogo giornaliero alle {}.", time);
            }
        }
    }

    fn show_message(&mut self, message: &ChatMessage) {
        if self.last_shown.is_some_and(|id| message.id <= id) {
            return;
        }
        println!("{}", chat::chat_message(message));
        self.last_shown = Some(message.id);
    }

    async fn show_unseen_messages(&mut self) {
        let messages = self.session.messages().await;
        for message in chat::unseen(&messages, self.last_shown) {
            self.show_message(message);
        }
    }

    async fn start_listening(&self) {
        let Some(voice) = &self.voice else {
            println!(
                "Nessun riconoscitore vocale configurato (recognizer_command in {}).",
                self.config_path.display()
            );
            return;
        };
        if let Err(e) = voice.start().await {
            log::error!("{}", e);
            println!("Impossibile avviare il microfono: {}", e.user_message());
        }
    }

    async fn show_calendar(&self) {
        let events = self.session.events().await;
        let today = Local::now().date_naive();
        println!("\n{}", month_calendar(&self.month_calendar, today, &events));
    }

    fn save_config(&self) {
        if let Err(e) = self.config.save(&self.config_path) {
            log::error!("Failed to save config: {}", e);
        }
    }
}

async fn next_voice_event(rx: &mut Option<broadcast::Receiver<VoiceEvent>>) -> Option<VoiceEvent> {
    let Some(rx) = rx else {
        return std::future::pending().await;
    };
    loop {
        match rx.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(n)) => {
                log::warn!("Dropped {} voice events", n);
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}
