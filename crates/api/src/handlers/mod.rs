//! Request handlers, grouped by resource.

pub mod alerts;
pub mod events;
pub mod statistics;
