// file: src/utils/mod.rs
// description: utility functions module exports
// reference: internal module structure

pub mod logging;
pub mod progress_bar;
pub mod telemetry;
pub mod validation;

pub use progress_bar::{TaskBar, TaskProgressBars};
pub use telemetry::OperationTimer;
pub use validation::Validator;
