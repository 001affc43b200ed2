pub mod config;
pub mod fd_limit;
pub mod logger;
pub(crate) mod pardu_toml;

pub use config::*;
pub use fd_limit::determine_threads_given_fd_limit;
pub use logger::setup_logging;
