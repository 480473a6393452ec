mod logger;
pub use logger::*;

#[cfg(feature = "events")]
mod events;

#[cfg(feature = "events")]
pub use events::EventLogger;
