//! Delivery scheduling: one unreliable network call turned into an
//! at-least-once process with explicit state transitions.
//!
//! A record is `Unsent` until its first [`Scheduler::submit`]. A
//! successful transport round-trip with a trustworthy reply is terminal
//! — [`DeliveryOutcome::Registered`] or [`DeliveryOutcome::Rejected`] —
//! and the record is never resubmitted. Transport failures and
//! untrustworthy replies park the record in an in-memory retry queue
//! ([`DeliveryOutcome::Pending`]); [`Scheduler::dispatch_pending`]
//! re-attempts the queue in insertion order. Durability of the queue is
//! the caller's responsibility.
//!
//! The printed receipt needs the PKP/BKP codes in every one of those
//! outcomes, so each outcome carries them.

mod scheduler;
mod transport;

pub use scheduler::*;
pub use transport::*;

use crate::core::Mode;

/// Production registration endpoint.
pub const PRODUCTION_ENDPOINT: &str = "https://prod.eet.cz/eet/services/EETServiceSOAP/v3/";

/// Playground registration endpoint.
pub const PLAYGROUND_ENDPOINT: &str = "https://pg.eet.cz/eet/services/EETServiceSOAP/v3/";

/// The registration endpoint for a mode.
pub fn endpoint(mode: Mode) -> &'static str {
    match mode {
        Mode::Production => PRODUCTION_ENDPOINT,
        Mode::Playground => PLAYGROUND_ENDPOINT,
    }
}
