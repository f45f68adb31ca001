pub mod dialog;
pub mod ledger;

pub use dialog::DialogMemory;
pub use ledger::TokenLedger;
