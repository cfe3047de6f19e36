//! Bot behaviour: routing updates, converting PDFs, and the update worker pool.

pub mod dispatcher;
pub mod handler;

pub use dispatcher::{DispatchStats, UpdateDispatcher};
pub use handler::{HandleOutcome, UpdateHandler, UpdateProcessor, output_file_name};
