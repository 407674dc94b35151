use chrono::{NaiveDateTime, Timelike};

/// Wall-clock minute of the daily summary, parsed from "HH:mm".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SummaryTime {
    pub hour: u32,
    pub minute: u32,
}

impl SummaryTime {
    /// Returns `None` for anything that is not a valid 24-hour "H:mm" / "HH:mm".
    /// Only ASCII digits are accepted; minutes always take two.
    pub fn parse(raw: &str) -> Option<Self> {
        let (h, m) = raw.trim().split_once(':')?;
        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if !(1..=2).contains(&h.len()) || m.len() != 2 || !all_digits(h) || !all_digits(m) {
            return None;
        }
        let hour: u32 = h.parse().ok()?;
        let minute: u32 = m.parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self { hour, minute })
    }

    pub fn matches(&self, now: NaiveDateTime) -> bool {
        now.hour() == self.hour && now.minute() == self.minute
    }
}

impl std::fmt::Display for SummaryTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}
