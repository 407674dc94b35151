use std::collections::HashSet;
use std::fmt::Write;

use chrono::{Datelike, Duration, Local, NaiveDate};

use lucy::core::event::{CalendarEvent, events_on};
use lucy::core::locale;

#[derive(Debug, Clone)]
pub struct MonthCalendarState {
    /// First day of the displayed month.
    pub displayed_month: NaiveDate,
    /// Currently selected day (shows the agenda below the grid).
    pub selected_day: Option<NaiveDate>,
}

impl MonthCalendarState {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            displayed_month: first_of_month(today),
            selected_day: Some(today),
        }
    }

    pub fn prev_month(&mut self) {
        self.displayed_month = self
            .displayed_month
            .checked_sub_months(chrono::Months::new(1))
            .unwrap_or(self.displayed_month);
        self.selected_day = None;
    }

    pub fn next_month(&mut self) {
        self.displayed_month = self
            .displayed_month
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(self.displayed_month);
        self.selected_day = None;
    }

    /// Select a day, jumping to its month if needed.
    pub fn select_day(&mut self, date: NaiveDate) {
        self.displayed_month = first_of_month(date);
        self.selected_day = Some(date);
    }
}

impl Default for MonthCalendarState {
    fn default() -> Self {
        Self::new(Local::now().date_naive())
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn busy_days(events: &[CalendarEvent]) -> HashSet<NaiveDate> {
    events.iter().map(|e| e.local_date()).collect()
}

/// Render the month grid (Monday first) plus the agenda of the selected day.
///
/// Today is bracketed, the selected day is in angle brackets and days with
/// events carry a dot.
pub fn month_calendar(
    state: &MonthCalendarState,
    today: NaiveDate,
    events: &[CalendarEvent],
) -> String {
    let first = state.displayed_month;
    let busy = busy_days(events);
    let mut out = String::new();

    let _ = writeln!(out, "{:^35}", locale::month_year(first));
    for label in locale::WEEKDAY_LABELS {
        let _ = write!(out, " {:>2}  ", label);
    }
    out.push('\n');

    let grid_start = first - Duration::days(first.weekday().num_days_from_monday() as i64);

    // 6 rows of 7 days; trailing rows fully outside the month are skipped.
    for week in 0..6 {
        let mut line = String::new();
        let mut any_in_month = false;

        for day_of_week in 0..7 {
            let date = grid_start + Duration::days(week * 7 + day_of_week);
            if date.month() != first.month() || date.year() != first.year() {
                line.push_str("     ");
                continue;
            }
            any_in_month = true;

            let (open, close) = if date == today {
                ('[', ']')
            } else if state.selected_day == Some(date) {
                ('<', '>')
            } else {
                (' ', ' ')
            };
            let marker = if busy.contains(&date) { '·' } else { ' ' };
            let _ = write!(line, "{}{:>2}{}{}", open, date.day(), close, marker);
        }

        if any_in_month {
            out.push_str(line.trim_end());
            out.push('\n');
        }
    }

    if let Some(selected) = state.selected_day {
        for item in day_detail(selected, today, events) {
            out.push_str(&item);
            out.push('\n');
        }
    }

    out
}

/// Agenda lines for `date`; empty when nothing is planned.
fn day_detail(date: NaiveDate, today: NaiveDate, events: &[CalendarEvent]) -> Vec<String> {
    let day_events = events_on(events, date);
    if day_events.is_empty() {
        return Vec::new();
    }

    let label = format!("{} {}", locale::weekday_name(date), locale::day_month(date));
    let header = if date == today {
        format!("Oggi, {}", label)
    } else if date == today.succ_opt().unwrap_or(today) {
        format!("Domani, {}", label)
    } else {
        label
    };

    let mut items = vec![String::new(), header];
    for event in &day_events {
        let start = event.start_time.with_timezone(&Local);
        let end = event.end_time.with_timezone(&Local);
        items.push(format!(
            "  {} – {}  {}",
            start.format("%H:%M"),
            end.format("%H:%M"),
            event.title
        ));
    }
    items
}
