//! Signed SOAP envelope codec (WS-Security with X.509 binary tokens).
//!
//! Two symmetric operations:
//!
//! - **Build** — [`build_envelope`] serializes a [`SaleRecord`](crate::core::SaleRecord)
//!   into a transport message whose body subtree is digested (SHA-256
//!   over its exclusive canonical form) and whose signed-info subtree is
//!   signed (RSASSA-PKCS1-v1_5/SHA-256) with the operator key.
//! - **Parse & verify** — [`parse_response`] checks the peer certificate,
//!   the signature, the body digest, and the id cross-references before
//!   extracting a [`Response`](crate::core::Response).
//!
//! The digest and signature cover specific subtrees, not the whole
//! document, so the codec works on an owned element tree
//! ([`dom::Element`]) that can canonicalize any subtree on demand.
//! Namespaces and element names below are fixed by the EET protocol and
//! must be reproduced exactly.

pub mod dom;

mod build;
mod parse;

pub use build::{EnvelopeOptions, build_envelope, sign_envelope};
pub use parse::{
    AUTHORITY_ORGANIZATION, ParseOptions, VerifiedEnvelope, parse_envelope, parse_response,
};

/// Namespace URIs of the transport envelope and the EET schema.
pub mod ns {
    pub const SOAP: &str = "http://schemas.xmlsoap.org/soap/envelope/";
    pub const WSSE: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
    pub const WSU: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
    pub const DS: &str = "http://www.w3.org/2000/09/xmldsig#";
    pub const EET: &str = "http://fs.mfcr.cz/eet/schema/v3";
}

/// Algorithm and token-profile identifiers.
pub mod alg {
    pub const EXC_C14N: &str = "http://www.w3.org/2001/10/xml-exc-c14n#";
    pub const RSA_SHA256: &str = "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256";
    pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
    pub const X509_V3: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-x509-token-profile-1.0#X509v3";
    pub const BASE64_BINARY: &str =
        "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";
}
