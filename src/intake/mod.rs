pub mod controller;
pub mod state;

pub use controller::{IntakeController, ScanOutcome};
pub use state::{IntakeState, ScanFeedback, RECORDS_LIMIT};
