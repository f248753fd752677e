//! Command-line command handlers for longlapse.
//!
//! The default `run` command lives in [`crate::Longlapse`]; one-shot commands
//! get their own submodule here.

pub mod schedule;
