use chrono::{
    DateTime, Duration, FixedOffset, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeZone,
};
use serde::{Deserialize, Deserializer, Serialize};

/// A calendar entry as exchanged with the model: camelCase keys, RFC 3339 times.
/// Timestamps without an offset are read as local time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub start_time: DateTime<FixedOffset>,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub end_time: DateTime<FixedOffset>,
}

fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {:?}", raw)))
}

/// RFC 3339, or a naive ISO 8601 date-time taken as local wall-clock time.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    let naive = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.fixed_offset())
}

impl CalendarEvent {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_time: DateTime<FixedOffset>,
        end_time: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start_time,
            end_time,
        }
    }

    /// Local calendar date of the start.
    pub fn local_date(&self) -> NaiveDate {
        self.start_time.with_timezone(&Local).date_naive()
    }

    pub fn starts_on(&self, date: NaiveDate) -> bool {
        self.local_date() == date
    }
}

/// Events whose start falls on `date` (local time), in start order.
pub fn events_on(events: &[CalendarEvent], date: NaiveDate) -> Vec<CalendarEvent> {
    let mut day: Vec<CalendarEvent> = events
        .iter()
        .filter(|e| e.starts_on(date))
        .cloned()
        .collect();
    day.sort_by_key(|e| e.start_time);
    day
}

/// Local wall-clock time on `date` as a fixed-offset timestamp.
pub fn local_at(date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<FixedOffset>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    Local
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|dt| dt.fixed_offset())
}

/// Demo agenda for the first run: four meetings today, a dentist visit tomorrow.
pub fn sample_events(today: NaiveDate) -> Vec<CalendarEvent> {
    let tomorrow = today + Duration::days(1);
    let plan = [
        ("evt1", "Morning Stand-up Meeting", today, (9, 0), (9, 15)),
        ("evt2", "Design Review", today, (11, 0), (12, 30)),
        ("evt3", "Lunch with Alex", today, (13, 0), (14, 0)),
        ("evt4", "Project Phoenix Sync", today, (15, 30), (16, 30)),
        ("evt5", "Dentist Appointment", tomorrow, (10, 0), (10, 45)),
    ];

    plan.iter()
        .filter_map(|(id, title, date, (sh, sm), (eh, em))| {
            let start = local_at(*date, *sh, *sm)?;
            let end = local_at(*date, *eh, *em)?;
            Some(CalendarEvent::new(*id, *title, start, end))
        })
        .collect()
}
