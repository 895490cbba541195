//! Course Architect API Library Crate
//!
//! This library contains the web-facing side of Course Architect: the
//! configuration, the application state, the API handlers and models, and
//! the routing. The binaries in `bin/` are thin wrappers around it.

pub mod config;
pub mod handlers;
pub mod models;
pub mod router;
pub mod state;

/// Installs the global `tracing` subscriber used by every binary.
pub fn init_tracing(level: tracing::Level) {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
}
