pub mod cron;
pub mod model;
pub mod realtime;
pub mod runner;
pub mod store;

pub use realtime::run_daily_greeting;
pub use runner::ScheduleRunner;
pub use store::{ScheduleStore, StoreScheduleSink};
