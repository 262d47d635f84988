pub mod controller;
pub mod scheduler;

pub use controller::{BuyOutcome, PollOutcome, PositionController, SellOutcome};
pub use scheduler::{PassReport, ScanScheduler};
