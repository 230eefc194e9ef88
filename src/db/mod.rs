mod connection;
mod error;
mod helpers;
mod migrations;
mod models;
mod repositories;

pub use connection::{ChangeEvent, ChangeKind, Database};
pub use error::{GatewayError, GatewayResult};
pub use models::ScanRecord;
