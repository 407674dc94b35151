pub mod event;
pub mod locale;
pub mod message;
pub mod state;
pub mod summary_time;
