//! Pipeline entry points for poller operations.
//!
//! - `run_poller`: Log in and poll the listings until shutdown
//! - `run_check`: Fetch the listings once without notifying

pub mod poll;
pub mod run;

pub use poll::{PollOutcome, Poller, PollerState, RunSummary};
pub use run::{CheckedOffer, run_check, run_poller};
