//! shaper engine
//!
//! Supervises a long-running traffic-shaping engine process and keeps its
//! configuration in sync with remote sources.
//!
//! - `domain`: error kinds, value objects, ports and pure services
//! - `infrastructure`: adapters (file-backed stores, HTTP, release discovery)
//! - `application`: installer, process controller, sync orchestrator, app lifecycle

pub mod application;
pub mod constants;
pub mod domain;
pub mod infrastructure;

pub use application::{App, AppContext};
pub use domain::{DomainError, Result};

#[cfg(test)]
pub(crate) mod testing;
