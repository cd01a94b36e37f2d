//! Standard behaviors.
//!
//! All of them are request-level and work for commands and queries alike.

mod conditional;
mod logging;
mod timeout;

pub use conditional::When;
pub use logging::LoggingBehavior;
pub use timeout::{Elapsed, TimeoutBehavior};

pub use tracing::Level;
