use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};

pub use rsa::{RsaPrivateKey, RsaPublicKey};

use super::error::EetError;

/// An X.509 certificate reduced to the fields the protocol needs:
/// raw DER for the binary security token, issuer CN for mode derivation,
/// subject organization for peer checks, the validity window, and the
/// RSA public key for signature verification.
///
/// Parsed once at construction; acquisition and caching of the PEM/DER
/// bytes is the caller's concern.
#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
    issuer_cn: String,
    subject_organization: Option<String>,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    public_key: RsaPublicKey,
}

impl Certificate {
    /// Parse a PEM-armored certificate.
    pub fn from_pem(pem: &str) -> Result<Self, EetError> {
        let (_, doc) = x509_parser::pem::parse_x509_pem(pem.as_bytes())
            .map_err(|e| EetError::Certificate(format!("PEM parse error: {e}")))?;
        Self::from_der(&doc.contents)
    }

    /// Parse raw DER bytes.
    pub fn from_der(der: &[u8]) -> Result<Self, EetError> {
        let (_, cert) = x509_parser::parse_x509_certificate(der)
            .map_err(|e| EetError::Certificate(format!("DER parse error: {e}")))?;

        let issuer_cn = cert
            .issuer()
            .iter_common_name()
            .next()
            .and_then(|a| a.as_str().ok())
            .unwrap_or_default()
            .to_string();
        let subject_organization = cert
            .subject()
            .iter_organization()
            .next()
            .and_then(|a| a.as_str().ok())
            .map(str::to_string);

        let not_before = DateTime::<Utc>::from_timestamp(cert.validity().not_before.timestamp(), 0)
            .ok_or_else(|| EetError::Certificate("invalid notBefore".into()))?;
        let not_after = DateTime::<Utc>::from_timestamp(cert.validity().not_after.timestamp(), 0)
            .ok_or_else(|| EetError::Certificate("invalid notAfter".into()))?;

        let public_key = RsaPublicKey::from_public_key_der(cert.public_key().raw)
            .map_err(|e| EetError::Certificate(format!("not an RSA public key: {e}")))?;

        Ok(Self {
            der: der.to_vec(),
            issuer_cn,
            subject_organization,
            not_before,
            not_after,
            public_key,
        })
    }

    /// Issuer common name, used to derive the operating [`Mode`](super::Mode).
    pub fn issuer_cn(&self) -> &str {
        &self.issuer_cn
    }

    /// Subject organization (`O`), the authority's legal name on
    /// response certificates.
    pub fn subject_organization(&self) -> Option<&str> {
        self.subject_organization.as_deref()
    }

    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }

    /// Whether `now` falls inside the validity window.
    pub fn valid_at(&self, now: DateTime<Utc>) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public_key
    }

    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// The BinarySecurityToken payload: base64 DER, which equals the PEM
    /// body with delimiters and line breaks stripped.
    pub fn security_token(&self) -> String {
        STANDARD.encode(&self.der)
    }
}

/// Parse an RSA private key from PEM, accepting both PKCS#8
/// (`BEGIN PRIVATE KEY`) and PKCS#1 (`BEGIN RSA PRIVATE KEY`) framing.
pub fn private_key_from_pem(pem: &str) -> Result<RsaPrivateKey, EetError> {
    let key = if pem.contains("BEGIN RSA PRIVATE KEY") {
        RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| EetError::Certificate(format!("PKCS#1 key parse error: {e}")))?
    } else {
        RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| EetError::Certificate(format!("PKCS#8 key parse error: {e}")))?
    };
    Ok(key)
}
