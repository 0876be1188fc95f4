//! # trzba
//!
//! Client library for the Czech EET fiscal sale-registration protocol
//! (Elektronická evidence tržeb, schema v3): every cash transaction is
//! described by a signed message, transmitted to the tax authority, and
//! confirmed by a FIK — or falls back to the offline PKP/BKP codes that
//! must appear on the printed receipt either way.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//!
//! ## Quick Start
//!
//! ```no_run
//! use trzba::core::*;
//! use rust_decimal_macros::dec;
//!
//! let certificate = Certificate::from_pem(&std::fs::read_to_string("operator.crt").unwrap()).unwrap();
//! let key = private_key_from_pem(&std::fs::read_to_string("operator.key").unwrap()).unwrap();
//!
//! let config = Config::new(
//!     certificate,
//!     key,
//!     TaxpayerId::new("CZ00000019").unwrap(),
//!     PremisesId::new(273).unwrap(),
//!     RegisterId::new("/5546/RO24").unwrap(),
//! );
//!
//! let sale = config
//!     .sale("0/6460/ZQ42", dec!(236.00))
//!     .standard_rate(dec!(195.04), dec!(40.96))
//!     .build()
//!     .unwrap();
//! ```
//!
//! With the `dispatch` feature, hand the record to a
//! [`Scheduler`](dispatch::Scheduler) for at-least-once delivery; with
//! `soap` alone, [`build_envelope`](soap::build_envelope) gives you the
//! signed bytes for your own transport.
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Value types, PKP/BKP fiscal codes, sale records, config |
//! | `soap` | Signed SOAP envelope build, parse & verify (exclusive C14N) |
//! | `dispatch` | Delivery scheduler with retry queue + blocking HTTP transport |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "soap")]
pub mod soap;

#[cfg(feature = "dispatch")]
pub mod dispatch;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
