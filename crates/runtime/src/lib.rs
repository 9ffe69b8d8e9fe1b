//! Foreground event loop around [`hydrate_tracker::HydrationApp`].

mod commands;
mod foreground;

pub use commands::{Lifecycle, RuntimeCommand};
pub use foreground::{ForegroundRuntime, RuntimeHandle};
