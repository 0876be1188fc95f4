use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, Utc};
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::dom::Element;
use super::{alg, ns};
use crate::core::codes;
use crate::core::{
    Certificate, Config, EetError, MessageUuid, SaleDateTime, SaleRecord, canonical_bool,
};

/// Per-envelope id overrides. The body and token ids are the only
/// non-deterministic inputs besides the send timestamp; pinning them
/// makes a build byte-reproducible.
#[derive(Debug, Clone, Default)]
pub struct EnvelopeOptions {
    /// `wsu:Id` of the SOAP body (`id-<uuid>` when absent).
    pub body_id: Option<String>,
    /// `wsu:Id` of the binary security token (`X509-<uuid>` when absent).
    pub token_id: Option<String>,
}

/// Serialize a sale record into the signed transport message.
///
/// Stamps the header: the message id is generated once and kept across
/// retries, the send timestamp is refreshed on every build. Fiscal codes
/// are computed on first build only — the signed text must stay
/// identical across attempts.
///
/// This is the synchronous "build only" path; all errors here are local
/// and surface before any network activity.
pub fn build_envelope(
    record: &mut SaleRecord,
    config: &Config,
    now: DateTime<Utc>,
    options: &EnvelopeOptions,
) -> Result<Vec<u8>, EetError> {
    if record.header.message_id.is_none() {
        record.header.message_id = Some(MessageUuid::generate());
    }
    record.header.sent_at = Some(SaleDateTime::new(now.fixed_offset()));
    if record.codes.is_none() {
        record.codes = Some(codes::compute(&record.data, config.private_key())?);
    }

    let sale = sale_element(record)?;
    sign_envelope(sale, config.certificate(), config.private_key(), options)
}

/// Wrap any content element into a WS-Security envelope signed with the
/// given certificate and key: digest the canonical body, sign the
/// canonical signed-info, cross-reference body and token by fragment id.
/// Exposed separately so a playground stand-in can seal `Odpoved`
/// documents the same way the gateway does.
pub fn sign_envelope(
    content: Element,
    certificate: &Certificate,
    key: &RsaPrivateKey,
    options: &EnvelopeOptions,
) -> Result<Vec<u8>, EetError> {
    let body_id = options
        .body_id
        .clone()
        .unwrap_or_else(|| format!("id-{}", Uuid::new_v4()));
    let token_id = options
        .token_id
        .clone()
        .unwrap_or_else(|| format!("X509-{}", Uuid::new_v4()));

    let body = Element::new(Some("soap"), ns::SOAP, "Body")
        .attr_ns("wsu", ns::WSU, "Id", &body_id)
        .child(content);

    // The digest covers the standalone canonical body subtree; the
    // verifier recomputes it from the extracted subtree, so the bytes
    // must not depend on where the body sits in the document.
    let digest_value = STANDARD.encode(Sha256::digest(body.canonicalize()));

    let signed_info = Element::new(Some("ds"), ns::DS, "SignedInfo")
        .child(
            Element::new(Some("ds"), ns::DS, "CanonicalizationMethod")
                .attr("Algorithm", alg::EXC_C14N),
        )
        .child(
            Element::new(Some("ds"), ns::DS, "SignatureMethod")
                .attr("Algorithm", alg::RSA_SHA256),
        )
        .child(
            Element::new(Some("ds"), ns::DS, "Reference")
                .attr("URI", &format!("#{body_id}"))
                .child(
                    Element::new(Some("ds"), ns::DS, "Transforms").child(
                        Element::new(Some("ds"), ns::DS, "Transform")
                            .attr("Algorithm", alg::EXC_C14N),
                    ),
                )
                .child(
                    Element::new(Some("ds"), ns::DS, "DigestMethod")
                        .attr("Algorithm", alg::SHA256),
                )
                .child(Element::new(Some("ds"), ns::DS, "DigestValue").text(&digest_value)),
        );

    let signature_value = STANDARD.encode(codes::sign_sha256(key, &signed_info.canonicalize())?);

    let security = Element::new(Some("wsse"), ns::WSSE, "Security")
        .attr_ns("soap", ns::SOAP, "mustUnderstand", "1")
        .child(
            Element::new(Some("wsse"), ns::WSSE, "BinarySecurityToken")
                .attr("EncodingType", alg::BASE64_BINARY)
                .attr("ValueType", alg::X509_V3)
                .attr_ns("wsu", ns::WSU, "Id", &token_id)
                .text(&certificate.security_token()),
        )
        .child(
            Element::new(Some("ds"), ns::DS, "Signature")
                .child(signed_info)
                .child(Element::new(Some("ds"), ns::DS, "SignatureValue").text(&signature_value))
                .child(
                    Element::new(Some("ds"), ns::DS, "KeyInfo").child(
                        Element::new(Some("wsse"), ns::WSSE, "SecurityTokenReference").child(
                            Element::new(Some("wsse"), ns::WSSE, "Reference")
                                .attr("URI", &format!("#{token_id}"))
                                .attr("ValueType", alg::X509_V3),
                        ),
                    ),
                ),
        );

    let envelope = Element::new(Some("soap"), ns::SOAP, "Envelope")
        .child(Element::new(Some("soap"), ns::SOAP, "Header").child(security))
        .child(body);

    Ok(envelope.canonicalize())
}

/// The `Trzba` payload: header and data attributes plus the control
/// codes. Absent optional fields are omitted, never emitted empty.
fn sale_element(record: &SaleRecord) -> Result<Element, EetError> {
    let message_id = record
        .header
        .message_id
        .as_ref()
        .ok_or_else(|| EetError::Protocol("record has no message id".into()))?;
    let sent_at = record
        .header
        .sent_at
        .as_ref()
        .ok_or_else(|| EetError::Protocol("record has no send timestamp".into()))?;
    let codes = record
        .codes
        .as_ref()
        .ok_or_else(|| EetError::Protocol("record has no fiscal codes".into()))?;

    let mut header = Element::new(Some("eet"), ns::EET, "Hlavicka")
        .attr("uuid_zpravy", &message_id.canonical())
        .attr("dat_odesl", &sent_at.canonical())
        .attr("prvni_zaslani", canonical_bool(record.header.first_submission));
    if record.header.verification {
        header = header.attr("overeni", canonical_bool(true));
    }

    let d = &record.data;
    let mut data = Element::new(Some("eet"), ns::EET, "Data")
        .attr("dic_popl", d.taxpayer_id.as_str());
    if let Some(delegating) = &d.delegating_taxpayer_id {
        data = data.attr("dic_poverujiciho", delegating.as_str());
    }
    data = data
        .attr("id_provoz", &d.premises_id.canonical())
        .attr("id_pokl", d.register_id.as_str())
        .attr("porad_cis", d.receipt_seq.as_str())
        .attr("dat_trzby", &d.recorded_at.canonical())
        .attr("celk_trzba", &d.total.canonical());
    for (name, amount) in d.optional_amounts() {
        if let Some(amount) = amount {
            data = data.attr(name, &amount.canonical());
        }
    }
    data = data.attr("rezim", d.regime.canonical());

    let control = Element::new(Some("eet"), ns::EET, "KontrolniKody")
        .child(
            Element::new(Some("eet"), ns::EET, "pkp")
                .attr("cipher", "RSA2048")
                .attr("digest", "SHA256")
                .attr("encoding", "base64")
                .text(codes.pkp.as_str()),
        )
        .child(
            Element::new(Some("eet"), ns::EET, "bkp")
                .attr("digest", "SHA1")
                .attr("encoding", "base16")
                .text(codes.bkp.as_str()),
        );

    Ok(Element::new(Some("eet"), ns::EET, "Trzba")
        .child(header)
        .child(data)
        .child(control))
}
