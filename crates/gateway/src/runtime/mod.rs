//! Core runtime: cancellation, per-session concurrency, the Planner/
//! Executor/Reviewer pipeline, its Transport fan-out, and the email
//! scheduler subsystem.

pub mod cancel;
pub mod executor;
pub mod planner;
pub mod reviewer;
pub mod schedules;
pub mod session_lock;
pub mod thinking;
pub mod transport;
pub mod turn;

#[cfg(test)]
pub mod scripted_provider;

pub use cancel::{CancelMap, CancelToken};
pub use executor::Executor;
pub use planner::Planner;
pub use reviewer::Reviewer;
pub use session_lock::{SessionBusy, SessionLockMap};
pub use transport::{SessionTransport, Transport, TransportEvent};
pub use turn::{TurnDriver, TurnOutcome};
