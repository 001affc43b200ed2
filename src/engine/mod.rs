//! Engine module: CLI, aggregation of walk output, and presentation.

pub mod aggregate;
pub mod arg_parser;
pub mod format;
pub mod handlers;
pub mod progress;

// Re-export commonly used functions
pub use aggregate::{Summary, Totals, aggregate};
pub use arg_parser::Cli;
pub use format::{format_row, format_size, human_size};
pub use handlers::handle_run;
