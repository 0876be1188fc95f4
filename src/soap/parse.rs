use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::sha2::Sha256 as RsaSha256;
use rsa::signature::Verifier;
use sha2::{Digest, Sha256};

use super::dom::{self, Element};
use super::ns;
use crate::core::{
    Certificate, Confirmation, EetError, ErrorCode, FiscalId, MessageUuid, RegistrationError,
    Response, ResponseHeader, SaleDateTime, ShortCode, ValidationError, Warning, WarningCode,
};

/// Legal name of the tax authority on response signing certificates.
pub const AUTHORITY_ORGANIZATION: &str = "Česká republika - Generální finanční ředitelství";

/// Verification knobs for [`parse_envelope`] / [`parse_response`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Skip the asymmetric signature check. Digest, reference, and
    /// certificate checks still run — this exists for the playground,
    /// whose responses may be signed by test material, and must stay
    /// off in production.
    pub ignore_invalid_cert: bool,
    /// Instant used for the certificate validity check; wall clock when
    /// absent.
    pub now: Option<DateTime<Utc>>,
}

/// An envelope whose security header checked out (or was absent).
#[derive(Debug, Clone)]
pub struct VerifiedEnvelope {
    /// The SOAP body subtree.
    pub body: Element,
    /// False when the document carried no security header and
    /// verification was skipped (locally constructed or test documents).
    pub verified: bool,
}

/// Parse a transport message and verify its security header:
/// peer certificate organization and validity, signature over the
/// canonical signed-info, body digest, and the two fragment-id
/// references. Documents without a security header skip verification.
pub fn parse_envelope(bytes: &[u8], options: &ParseOptions) -> Result<VerifiedEnvelope, EetError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| EetError::Xml(format!("document is not UTF-8: {e}")))?;
    let root = dom::parse(text)?;
    if !root.is_named(ns::SOAP, "Envelope") {
        return Err(EetError::Xml("document is not a SOAP envelope".into()));
    }
    let body = root
        .child_named(ns::SOAP, "Body")
        .ok_or_else(|| EetError::Xml("envelope has no Body".into()))?
        .clone();

    let security = root
        .child_named(ns::SOAP, "Header")
        .and_then(|h| h.find(ns::WSSE, "Security"));
    let Some(security) = security else {
        return Ok(VerifiedEnvelope {
            body,
            verified: false,
        });
    };

    // a. the embedded certificate must belong to the authority
    let token = security
        .find(ns::WSSE, "BinarySecurityToken")
        .ok_or_else(|| EetError::Protocol("security header has no binary token".into()))?;
    let der = STANDARD
        .decode(collapse_whitespace(&token.text_content()))
        .map_err(|e| EetError::Certificate(format!("token is not base64: {e}")))?;
    let certificate = Certificate::from_der(&der)?;
    let organization = certificate.subject_organization().unwrap_or_default();
    if organization != AUTHORITY_ORGANIZATION {
        return Err(EetError::UntrustedPeer(format!(
            "certificate organization {organization:?}"
        )));
    }

    // b. validity window
    let now = options.now.unwrap_or_else(Utc::now);
    if !certificate.valid_at(now) {
        return Err(EetError::ExpiredCertificate(format!(
            "valid {} to {}, checked at {}",
            certificate.not_before(),
            certificate.not_after(),
            now
        )));
    }

    let signature = security
        .find(ns::DS, "Signature")
        .ok_or_else(|| EetError::Protocol("security header has no signature".into()))?;
    let signed_info = signature
        .child_named(ns::DS, "SignedInfo")
        .ok_or_else(|| EetError::Protocol("signature has no SignedInfo".into()))?;

    // c. signature over the canonical signed-info subtree
    if !options.ignore_invalid_cert {
        let signature_value = signature
            .child_named(ns::DS, "SignatureValue")
            .ok_or_else(|| EetError::Protocol("signature has no SignatureValue".into()))?;
        let raw = STANDARD
            .decode(collapse_whitespace(&signature_value.text_content()))
            .map_err(|_| EetError::InvalidSignature)?;
        let verifying_key = VerifyingKey::<RsaSha256>::new(certificate.public_key().clone());
        let signature = Signature::try_from(raw.as_slice()).map_err(|_| EetError::InvalidSignature)?;
        verifying_key
            .verify(&signed_info.canonicalize(), &signature)
            .map_err(|_| EetError::InvalidSignature)?;
    }

    // d. recompute the body digest
    let declared = signed_info
        .find(ns::DS, "DigestValue")
        .map(|e| collapse_whitespace(&e.text_content()))
        .ok_or_else(|| EetError::Protocol("signed info has no DigestValue".into()))?;
    let actual = STANDARD.encode(Sha256::digest(body.canonicalize()));
    if declared != actual {
        return Err(EetError::DigestMismatch);
    }

    // e. fragment-id cross-references must point at the body and token
    let body_id = body
        .attr_value_ns(ns::WSU, "Id")
        .ok_or_else(|| EetError::InvalidReference("body has no wsu:Id".into()))?;
    let token_id = token
        .attr_value_ns(ns::WSU, "Id")
        .ok_or_else(|| EetError::InvalidReference("token has no wsu:Id".into()))?;
    ensure_unique_id(&root, body_id)?;
    ensure_unique_id(&root, token_id)?;

    let digest_uri = signed_info
        .find(ns::DS, "Reference")
        .and_then(|r| r.attr_value("URI"))
        .unwrap_or_default();
    if digest_uri != format!("#{body_id}") {
        return Err(EetError::InvalidReference(format!(
            "digest reference {digest_uri:?} does not match body id {body_id:?}"
        )));
    }
    let key_uri = signature
        .find(ns::WSSE, "SecurityTokenReference")
        .and_then(|r| r.child_named(ns::WSSE, "Reference"))
        .and_then(|r| r.attr_value("URI"))
        .unwrap_or_default();
    if key_uri != format!("#{token_id}") {
        return Err(EetError::InvalidReference(format!(
            "key reference {key_uri:?} does not match token id {token_id:?}"
        )));
    }

    Ok(VerifiedEnvelope {
        body,
        verified: true,
    })
}

/// Parse and verify an authority reply, then extract the response:
/// header echo, confirmation or error payload, warnings.
pub fn parse_response(bytes: &[u8], options: &ParseOptions) -> Result<Response, EetError> {
    let envelope = parse_envelope(bytes, options)?;
    let reply = envelope
        .body
        .child_named(ns::EET, "Odpoved")
        .ok_or_else(|| EetError::Protocol("body has no Odpoved element".into()))?;
    extract_response(reply)
}

fn extract_response(reply: &Element) -> Result<Response, EetError> {
    let mut header = ResponseHeader::default();
    if let Some(h) = reply.child_named(ns::EET, "Hlavicka") {
        header.message_id = parse_attr(h, "uuid_zpravy", MessageUuid::new)?;
        header.short_code = parse_attr(h, "bkp", |s| ShortCode::new(s))?;
        header.accepted_at = parse_attr(h, "dat_prij", SaleDateTime::parse)?;
        header.rejected_at = parse_attr(h, "dat_odmit", SaleDateTime::parse)?;
    }

    let confirmation = reply
        .child_named(ns::EET, "Potvrzeni")
        .map(|p| -> Result<Confirmation, EetError> {
            let fik = p
                .attr_value("fik")
                .ok_or_else(|| EetError::Protocol("Potvrzeni has no fik".into()))?;
            Ok(Confirmation {
                fiscal_id: FiscalId::new(fik).map_err(protocol_violation)?,
                test: bool_attr(p, "test")?,
            })
        })
        .transpose()?;

    let error = reply
        .child_named(ns::EET, "Chyba")
        .map(|c| -> Result<RegistrationError, EetError> {
            let code: i16 = c
                .attr_value("kod")
                .ok_or_else(|| EetError::Protocol("Chyba has no kod".into()))?
                .parse()
                .map_err(|_| EetError::Protocol("Chyba kod is not an integer".into()))?;
            Ok(RegistrationError {
                code: ErrorCode::new(code).map_err(protocol_violation)?,
                test: bool_attr(c, "test")?,
                message: c.text_content().trim().to_string(),
            })
        })
        .transpose()?;

    // Protocol-illegal: the reply must not claim success and failure at
    // once, and precedence must not be guessed.
    if confirmation.is_some() && error.is_some() {
        return Err(EetError::Protocol(
            "reply carries both Potvrzeni and Chyba".into(),
        ));
    }

    let warnings = reply
        .children_named(ns::EET, "Varovani")
        .map(|w| -> Result<Warning, EetError> {
            let code: i16 = w
                .attr_value("kod_varov")
                .ok_or_else(|| EetError::Protocol("Varovani has no kod_varov".into()))?
                .parse()
                .map_err(|_| EetError::Protocol("Varovani kod_varov is not an integer".into()))?;
            Ok(Warning {
                code: WarningCode::new(code).map_err(protocol_violation)?,
                message: w.text_content().trim().to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Response {
        header,
        confirmation,
        error,
        warnings,
    })
}

fn protocol_violation(e: ValidationError) -> EetError {
    EetError::Protocol(e.to_string())
}

fn parse_attr<T>(
    element: &Element,
    name: &str,
    parse: impl Fn(&str) -> Result<T, ValidationError>,
) -> Result<Option<T>, EetError> {
    element
        .attr_value(name)
        .map(|v| parse(v).map_err(protocol_violation))
        .transpose()
}

fn bool_attr(element: &Element, name: &str) -> Result<bool, EetError> {
    match element.attr_value(name) {
        None => Ok(false),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(other) => Err(EetError::Protocol(format!(
            "{name}={other:?} is not a boolean"
        ))),
    }
}

/// Reject duplicated `wsu:Id` values — signature wrapping attacks rely
/// on a second element stealing the signed id.
fn ensure_unique_id(root: &Element, id: &str) -> Result<(), EetError> {
    let occurrences = root
        .descendants()
        .iter()
        .filter(|e| e.attr_value_ns(ns::WSU, "Id") == Some(id))
        .count();
    if occurrences != 1 {
        return Err(EetError::InvalidReference(format!(
            "wsu:Id {id:?} appears {occurrences} times"
        )));
    }
    Ok(())
}

fn collapse_whitespace(text: &str) -> String {
    text.chars().filter(|c| !c.is_ascii_whitespace()).collect()
}
