mod args;
mod error;
mod logger;

pub use args::CliArgs;
pub use error::{ErrorKind, FieldErrors, SyncError};
pub use logger::setup_logging;
