pub mod chat;
pub mod month_calendar;
