//! Once-a-day summary announcement.
//!
//! A timer polls the wall clock every minute. When the clock reads the
//! configured "HH:mm" and no summary went out today, the day's events are
//! sent to the interpreter and the reply is posted to the chat.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::ai::CommandInterpreter;
use crate::core::event::events_on;
use crate::core::locale;
use crate::core::message::Sender;
use crate::core::summary_time::SummaryTime;
use crate::session::Session;

pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

pub const SUMMARY_FAILURE: &str =
    "Ho avuto problemi a generare il tuo riepilogo giornaliero. Controlla la connessione.";

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

pub fn summary_prompt(today: NaiveDate) -> String {
    format!(
        "Fornisci un breve e amichevole riepilogo dei seguenti eventi per oggi, {}. Se non ci sono eventi, dillo con allegria.",
        today.format("%Y-%m-%d")
    )
}

/// State shared by the timer task and every re-arm of it.
struct SummaryJob {
    session: Session,
    interpreter: Arc<dyn CommandInterpreter>,
    clock: Arc<dyn Clock>,
    summary_time: Mutex<String>,
    last_fired: Mutex<Option<NaiveDate>>,
}

impl SummaryJob {
    async fn tick(self: &Arc<Self>, now: NaiveDateTime) -> Option<JoinHandle<()>> {
        let target = SummaryTime::parse(&self.summary_time.lock().await)?;
        if !target.matches(now) {
            return None;
        }

        let today = now.date();
        {
            let mut last_fired = self.last_fired.lock().await;
            if *last_fired == Some(today) {
                return None;
            }
            // Claimed before the call so a slow reply cannot cause a second fire.
            *last_fired = Some(today);
        }

        log::info!("Generating daily summary for {}", today);
        let job = Arc::clone(self);
        Some(tokio::spawn(async move { job.summarize(today).await }))
    }

    async fn summarize(&self, today: NaiveDate) {
        self.session.set_loading(true).await;

        let todays_events = events_on(&self.session.events().await, today);
        let prompt = summary_prompt(today);

        match self.interpreter.interpret(&prompt, &todays_events).await {
            Ok(interpretation) => {
                let text = format!(
                    "Ecco il tuo riepilogo giornaliero per {}:\n\n{}",
                    locale::day_month(today),
                    interpretation.response_text
                );
                self.session.push_message(Sender::Assistant, text).await;
            }
            Err(e) => {
                log::error!("Failed to generate daily summary: {}", e);
                self.session
                    .push_message(Sender::Assistant, SUMMARY_FAILURE)
                    .await;
            }
        }

        self.session.set_loading(false).await;
    }
}

pub struct DailySummaryScheduler {
    job: Arc<SummaryJob>,
    poll_interval: Duration,
    timer: Option<JoinHandle<()>>,
}

impl DailySummaryScheduler {
    pub fn new(
        session: Session,
        interpreter: Arc<dyn CommandInterpreter>,
        summary_time: impl Into<String>,
    ) -> Self {
        Self {
            job: Arc::new(SummaryJob {
                session,
                interpreter,
                clock: Arc::new(SystemClock),
                summary_time: Mutex::new(summary_time.into()),
                last_fired: Mutex::new(None),
            }),
            poll_interval: POLL_INTERVAL,
            timer: None,
        }
    }

    /// Replace the clock. Must be called before `start`.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        if let Some(job) = Arc::get_mut(&mut self.job) {
            job.clock = clock;
        }
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    pub async fn summary_time(&self) -> String {
        self.job.summary_time.lock().await.clone()
    }

    pub async fn last_fired(&self) -> Option<NaiveDate> {
        *self.job.last_fired.lock().await
    }

    /// Arm the timer. The first poll happens one interval from now.
    pub fn start(&mut self) {
        self.stop();

        let job = Arc::clone(&self.job);
        let period = self.poll_interval;
        self.timer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let now = job.clock.now();
                // The summary runs detached so tearing the timer down never cancels it.
                let _ = job.tick(now).await;
            }
        }));
        log::debug!("Daily summary timer armed (every {:?})", period);
    }

    /// Change the summary time and re-arm. Today's fired flag is kept.
    pub async fn reconfigure(&mut self, summary_time: &str) {
        *self.job.summary_time.lock().await = summary_time.trim().to_string();
        if SummaryTime::parse(summary_time).is_none() {
            log::warn!("Summary time {:?} is not HH:mm; no summary will fire", summary_time);
        }
        self.restart();
    }

    /// Tear down and re-arm, e.g. after the event store was replaced.
    pub fn restart(&mut self) {
        if self.is_running() {
            self.start();
        }
    }

    /// Stop future polls. A summary already in flight still completes.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
            log::debug!("Daily summary timer torn down");
        }
    }

    /// Run one poll at `now`. Returns the summary task when it fired.
    pub async fn tick(&self, now: NaiveDateTime) -> Option<JoinHandle<()>> {
        self.job.tick(now).await
    }
}

impl Drop for DailySummaryScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Interpretation;
    use crate::core::event::{CalendarEvent, local_at};
    use crate::core::state::AppState;
    use crate::error::AssistantError;
    use crate::testing::{FixedClock, ScriptedInterpreter};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, day).unwrap()
    }

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        d(day).and_hms_opt(h, m, 0).unwrap()
    }

    fn event(id: &str, day: u32, hour: u32) -> CalendarEvent {
        CalendarEvent::new(
            id,
            format!("Evento {}", id),
            local_at(d(day), hour, 0).unwrap(),
            local_at(d(day), hour + 1, 0).unwrap(),
        )
    }

    fn setup(events: Vec<CalendarEvent>) -> (Session, Arc<ScriptedInterpreter>, DailySummaryScheduler) {
        let session = Session::new(AppState::default(), events);
        let interpreter = Arc::new(ScriptedInterpreter::default());
        let scheduler = DailySummaryScheduler::new(session.clone(), interpreter.clone(), "08:00");
        (session, interpreter, scheduler)
    }

    #[test]
    fn prompt_names_the_date() {
        assert!(summary_prompt(d(20)).contains("oggi, 2026-04-20."));
    }

    #[tokio::test]
    async fn fires_once_per_day_at_the_configured_minute() {
        let (session, interpreter, scheduler) = setup(Vec::new());
        interpreter.push_ok(Interpretation::reply("Giornata libera!"));
        interpreter.push_ok(Interpretation::reply("Di nuovo libera!"));

        assert!(scheduler.tick(at(20, 7, 59)).await.is_none());

        scheduler.tick(at(20, 8, 0)).await.unwrap().await.unwrap();
        assert!(scheduler.tick(at(20, 8, 0)).await.is_none());
        assert!(scheduler.tick(at(20, 8, 1)).await.is_none());
        assert_eq!(interpreter.calls().len(), 1);
        assert_eq!(scheduler.last_fired().await, Some(d(20)));

        scheduler.tick(at(21, 8, 0)).await.unwrap().await.unwrap();
        assert_eq!(interpreter.calls().len(), 2);

        let messages = session.messages().await;
        assert_eq!(messages.len(), 2);
        assert_eq!(
            messages[0].text,
            "Ecco il tuo riepilogo giornaliero per 20 aprile:\n\nGiornata libera!"
        );
        assert_eq!(messages[0].sender, Sender::Assistant);
        assert!(messages[1].text.contains("21 aprile"));
        assert!(!session.app_state().await.is_loading);
    }

    #[tokio::test]
    async fn only_todays_events_are_summarized() {
        let (_, interpreter, scheduler) =
            setup(vec![event("ieri", 19, 9), event("oggi", 20, 10), event("domani", 21, 9)]);
        interpreter.push_ok(Interpretation::reply("Un solo impegno."));

        scheduler.tick(at(20, 8, 0)).await.unwrap().await.unwrap();

        let calls = interpreter.calls();
        assert_eq!(calls[0].0, summary_prompt(d(20)));
        assert_eq!(calls[0].1.len(), 1);
        assert_eq!(calls[0].1[0].id, "oggi");
    }

    #[tokio::test]
    async fn malformed_time_never_fires() {
        let (session, interpreter, mut scheduler) = setup(Vec::new());
        scheduler.reconfigure("otto").await;

        for minute in 0..60 {
            assert!(scheduler.tick(at(20, 8, minute)).await.is_none());
        }
        assert!(interpreter.calls().is_empty());
        assert!(session.messages().await.is_empty());
    }

    #[tokio::test]
    async fn failure_posts_fixed_message() {
        let (session, interpreter, scheduler) = setup(Vec::new());
        interpreter.push_err(AssistantError::Request("offline".into()));

        scheduler.tick(at(20, 8, 0)).await.unwrap().await.unwrap();

        let messages = session.messages().await;
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, SUMMARY_FAILURE);
        assert!(!session.app_state().await.is_loading);
        // Still counts as today's summary.
        assert!(scheduler.tick(at(20, 8, 0)).await.is_none());
    }

    #[tokio::test]
    async fn reconfiguring_does_not_refire_the_same_day() {
        let (_, interpreter, mut scheduler) = setup(Vec::new());
        interpreter.push_ok(Interpretation::reply("Ok"));

        scheduler.tick(at(20, 8, 0)).await.unwrap().await.unwrap();
        scheduler.reconfigure("09:30").await;
        assert_eq!(scheduler.summary_time().await, "09:30");

        assert!(scheduler.tick(at(20, 9, 30)).await.is_none());
        assert_eq!(interpreter.calls().len(), 1);
    }

    #[tokio::test]
    async fn summary_replies_never_touch_the_event_store() {
        let (session, interpreter, scheduler) = setup(vec![event("oggi", 20, 10)]);
        interpreter.push_ok(Interpretation::with_events("Riepilogo", Vec::new()));

        scheduler.tick(at(20, 8, 0)).await.unwrap().await.unwrap();

        assert_eq!(session.events().await.len(), 1);
    }

    #[tokio::test]
    async fn stopping_keeps_an_in_flight_summary() {
        let (session, interpreter, mut scheduler) = setup(Vec::new());
        let gate = interpreter.push_gated(Interpretation::reply("Tardi ma arrivo"));

        scheduler.start();
        let summary = scheduler.tick(at(20, 8, 0)).await.unwrap();
        scheduler.stop();
        assert!(!scheduler.is_running());

        gate.send(()).unwrap();
        summary.await.unwrap();
        assert!(session.messages().await[0].text.ends_with("Tardi ma arrivo"));
    }

    #[tokio::test]
    async fn timer_polls_the_clock_and_fires_once() {
        let session = Session::new(AppState::default(), Vec::new());
        let interpreter = Arc::new(ScriptedInterpreter::default());
        interpreter.push_ok(Interpretation::reply("Buongiorno!"));
        let clock = Arc::new(FixedClock::new(at(20, 7, 59)));
        let mut scheduler = DailySummaryScheduler::new(session.clone(), interpreter.clone(), "08:00")
            .with_clock(clock.clone())
            .with_poll_interval(Duration::from_millis(5));

        scheduler.start();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(session.messages().await.is_empty());

        clock.set(at(20, 8, 0));
        let fired = tokio::time::timeout(Duration::from_secs(5), async {
            while session.messages().await.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(fired.is_ok());

        // Several more polls land in the same minute.
        tokio::time::sleep(Duration::from_millis(40)).await;
        scheduler.stop();
        assert_eq!(interpreter.calls().len(), 1);
        assert_eq!(session.messages().await.len(), 1);
    }

    async fn wait_for_messages(session: &Session, n: usize) -> bool {
        tokio::time::timeout(Duration::from_secs(5), async {
            while session.messages().await.len() < n {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .is_ok()
    }

    #[tokio::test]
    async fn rearming_a_running_timer_keeps_todays_fired_flag() {
        let session = Session::new(AppState::default(), Vec::new());
        let interpreter = Arc::new(ScriptedInterpreter::default());
        interpreter.push_ok(Interpretation::reply("Primo giorno"));
        interpreter.push_ok(Interpretation::reply("Secondo giorno"));
        let clock = Arc::new(FixedClock::new(at(20, 8, 0)));
        let mut scheduler = DailySummaryScheduler::new(session.clone(), interpreter.clone(), "08:00")
            .with_clock(clock.clone())
            .with_poll_interval(Duration::from_millis(5));

        scheduler.start();
        assert!(wait_for_messages(&session, 1).await);

        // Same time again, then an event-store re-arm, still 08:00 on day 20.
        scheduler.reconfigure("08:00").await;
        scheduler.restart();
        assert!(scheduler.is_running());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(interpreter.calls().len(), 1);

        clock.set(at(20, 9, 30));
        scheduler.reconfigure("09:30").await;
        assert!(scheduler.is_running());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(interpreter.calls().len(), 1);

        clock.set(at(21, 9, 30));
        assert!(wait_for_messages(&session, 2).await);
        tokio::time::sleep(Duration::from_millis(40)).await;
        scheduler.stop();

        assert_eq!(interpreter.calls().len(), 2);
        assert_eq!(scheduler.last_fired().await, Some(d(21)));
        assert!(session.messages().await[1].text.ends_with("Secondo giorno"));
    }
}
