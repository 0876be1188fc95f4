use thiserror::Error;

/// Errors that can occur while building, signing, or delivering a sale
/// registration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EetError {
    /// A field value violated its schema invariant.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// RSA signing or verification machinery failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Certificate or key material could not be parsed.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// XML generation or parsing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// The response certificate does not belong to the tax authority.
    #[error("untrusted peer certificate: {0}")]
    UntrustedPeer(String),

    /// The response certificate is outside its validity window.
    #[error("peer certificate outside validity window: {0}")]
    ExpiredCertificate(String),

    /// The response signature does not match its signed-info subtree.
    #[error("envelope signature verification failed")]
    InvalidSignature,

    /// The recomputed body digest differs from the declared one.
    #[error("body digest mismatch")]
    DigestMismatch,

    /// A digest or key reference URI does not point at the expected id.
    #[error("broken envelope reference: {0}")]
    InvalidReference(String),

    /// The document is well-formed but violates the EET protocol.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// Network failure or timeout; the record stays deliverable.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// A single validation error with the offending field and a message.
///
/// Field names follow the EET schema attributes (e.g. `dic_popl`,
/// `celk_trzba`) so an error can be traced straight to the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Schema attribute or logical field name.
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    /// Create a validation error for a named field.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Re-attribute the error to another field, keeping the message.
    /// Used when a generic value-type error surfaces under a schema
    /// attribute (e.g. an `Amount` failure under `zakl_dan1`).
    pub fn for_field(self, field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: self.message,
        }
    }
}
