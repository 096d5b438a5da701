//! Fieldwatch domain logic.
//!
//! Pure types and functions shared by the persistence, supervision, and API
//! crates. This crate has no internal dependencies and touches neither the
//! database nor the network:
//!
//! - [`event`] — the equipment event model, the closed event-type set, and
//!   the severity classifier.
//! - [`inbound`] — parsing of raw queue messages into well-formed events.
//! - [`escalation`] — the alert escalation predicate.
//! - [`error`] — the domain error type.

pub mod error;
pub mod escalation;
pub mod event;
pub mod inbound;
pub mod types;

pub use error::CoreError;
pub use event::{EquipmentEvent, EventFilter, EventSeverity, EventType, NewEvent};
pub use inbound::{parse_message, MalformedEvent, ParsedEvent};
