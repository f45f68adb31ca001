pub mod config;
pub mod error;
pub mod ledger;
pub mod memory;
pub mod message;
pub mod plan;
pub mod schedule;
pub mod skill;
pub mod stream;

pub use error::{Error, ErrorKind, Result};
