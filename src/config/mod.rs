//! Configuration management.
//!
//! Settings are read from the XDG config directory or an explicit path and
//! supply defaults that command-line flags override.

mod settings;

pub use settings::{AppSettings, Paths};
