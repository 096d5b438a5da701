//! Fieldwatch supervision engine.
//!
//! The moving parts between the ingest queue and the API:
//!
//! - [`EventBus`] — in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`, carrying persisted events.
//! - [`IntakePool`] — fixed pool of workers draining the ingest queue:
//!   parse, classify, persist, publish; failures are dead-lettered.
//! - [`AlertEngine`] — bus subscriber running type-specific alert handlers
//!   for attention-worthy events, plus the escalation query surface.
//! - [`StatisticsAggregator`] — on-demand dashboard aggregates, re-derived
//!   from the store at every call.

pub mod alerts;
pub mod bus;
pub mod intake;
pub mod stats;

pub use alerts::AlertEngine;
pub use bus::EventBus;
pub use intake::{IntakeConfig, IntakePool};
pub use stats::StatisticsAggregator;
