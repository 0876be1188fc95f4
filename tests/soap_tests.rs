#![cfg(feature = "soap")]

use rust_decimal_macros::dec;
use trzba::core::*;
use trzba::soap::{
    EnvelopeOptions, ParseOptions, build_envelope, dom::Element, ns, parse_envelope,
    parse_response, sign_envelope,
};

mod common;
use common::*;

fn pinned_ids() -> EnvelopeOptions {
    EnvelopeOptions {
        body_id: Some("id-refbody".into()),
        token_id: Some("X509-reftoken".into()),
    }
}

fn verify_opts() -> ParseOptions {
    ParseOptions {
        ignore_invalid_cert: false,
        now: Some(test_now()),
    }
}

fn built_reference() -> (Config, SaleRecord, Vec<u8>) {
    let config = playground_config();
    let mut record = reference_record(&config);
    let bytes = build_envelope(&mut record, &config, test_now(), &pinned_ids()).unwrap();
    (config, record, bytes)
}

// --- Build ---

#[test]
fn build_stamps_header_and_codes_once() {
    let (_, record, _) = built_reference();
    assert!(record.header.message_id.is_some());
    assert_eq!(
        record.header.sent_at.as_ref().unwrap().canonical(),
        "2027-03-01T12:00:00+00:00"
    );
    let codes = record.codes.as_ref().unwrap();
    assert_eq!(codes.bkp.as_str(), REFERENCE_BKP);
    assert_eq!(codes.pkp.as_str(), REFERENCE_PKP);
}

#[test]
fn rebuild_is_byte_identical_and_keeps_codes() {
    let config = playground_config();
    let mut record = reference_record(&config);
    let first = build_envelope(&mut record, &config, test_now(), &pinned_ids()).unwrap();
    let codes_after_first = record.codes.clone();
    let second = build_envelope(&mut record, &config, test_now(), &pinned_ids()).unwrap();
    assert_eq!(first, second);
    assert_eq!(record.codes, codes_after_first);
}

#[test]
fn absent_optional_fields_are_omitted() {
    let (_, _, bytes) = built_reference();
    let text = String::from_utf8(bytes).unwrap();
    assert!(!text.contains("zakl_dan1"));
    assert!(!text.contains("dic_poverujiciho"));
    assert!(!text.contains("overeni"));
    assert!(text.contains("celk_trzba=\"100.00\""));
    assert!(text.contains("rezim=\"0\""));
    assert!(text.contains("prvni_zaslani=\"true\""));
}

#[test]
fn breakdown_amounts_are_rendered_canonically() {
    let config = playground_config();
    let mut record = config
        .sale("0/6460/ZQ42", dec!(100))
        .standard_rate(dec!(82.6), dec!(17.4))
        .verification(true)
        .build()
        .unwrap();
    let bytes = build_envelope(&mut record, &config, test_now(), &pinned_ids()).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("zakl_dan1=\"82.60\""));
    assert!(text.contains("dan1=\"17.40\""));
    assert!(text.contains("overeni=\"true\""));
}

#[test]
fn envelope_carries_token_and_references() {
    let (_, _, bytes) = built_reference();
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains("URI=\"#id-refbody\""));
    assert!(text.contains("URI=\"#X509-reftoken\""));
    assert!(text.contains("BinarySecurityToken"));
    // the token is the bare certificate, no PEM armor
    assert!(!text.contains("BEGIN CERTIFICATE"));
}

// --- Round-trip ---

#[test]
fn roundtrip_preserves_header_and_codes() {
    let (_, record, bytes) = built_reference();
    let envelope = parse_envelope(&bytes, &verify_opts()).unwrap();
    assert!(envelope.verified);

    let sale = envelope.body.child_named(ns::EET, "Trzba").unwrap();
    let header = sale.child_named(ns::EET, "Hlavicka").unwrap();
    assert_eq!(
        header.attr_value("uuid_zpravy").unwrap(),
        record.header.message_id.as_ref().unwrap().canonical()
    );
    assert_eq!(
        header.attr_value("dat_odesl").unwrap(),
        record.header.sent_at.as_ref().unwrap().canonical()
    );

    let control = sale.child_named(ns::EET, "KontrolniKody").unwrap();
    let codes = record.codes.as_ref().unwrap();
    assert_eq!(
        control.child_named(ns::EET, "pkp").unwrap().text_content(),
        codes.pkp.as_str()
    );
    assert_eq!(
        control.child_named(ns::EET, "bkp").unwrap().text_content(),
        codes.bkp.as_str()
    );
}

// --- Verification failures, each independent of the others ---

#[test]
fn corrupted_body_byte_fails_digest_not_signature() {
    let (_, _, bytes) = built_reference();
    let corrupted = String::from_utf8(bytes)
        .unwrap()
        .replace("porad_cis=\"0/6460/ZQ42\"", "porad_cis=\"0/6460/ZQ43\"");
    let err = parse_envelope(corrupted.as_bytes(), &verify_opts()).unwrap_err();
    assert!(matches!(err, EetError::DigestMismatch), "got {err:?}");
}

#[test]
fn corrupted_signature_value_fails_signature_check() {
    let (_, _, bytes) = built_reference();
    let text = String::from_utf8(bytes).unwrap();
    let marker = "<ds:SignatureValue>";
    let at = text.find(marker).unwrap() + marker.len();
    let mut bytes = text.into_bytes();
    bytes[at] = if bytes[at] == b'A' { b'B' } else { b'A' };
    let err = parse_envelope(&bytes, &verify_opts()).unwrap_err();
    assert!(matches!(err, EetError::InvalidSignature), "got {err:?}");
}

#[test]
fn tampered_digest_reference_fails_reference_check() {
    let (_, _, bytes) = built_reference();
    // URI is inside SignedInfo, so with full verification the signature
    // check would trip first; the reference check must still run when
    // the signature check is disabled.
    let tampered = String::from_utf8(bytes)
        .unwrap()
        .replace("URI=\"#id-refbody\"", "URI=\"#id-elsewhere\"");
    let options = ParseOptions {
        ignore_invalid_cert: true,
        now: Some(test_now()),
    };
    let err = parse_envelope(tampered.as_bytes(), &options).unwrap_err();
    assert!(matches!(err, EetError::InvalidReference(_)), "got {err:?}");
}

#[test]
fn tampered_key_reference_fails_even_with_valid_signature() {
    let (_, _, bytes) = built_reference();
    // KeyInfo sits outside SignedInfo: the signature stays valid, the
    // cross-reference does not.
    let tampered = String::from_utf8(bytes)
        .unwrap()
        .replace("URI=\"#X509-reftoken\"", "URI=\"#X509-other\"");
    let err = parse_envelope(tampered.as_bytes(), &verify_opts()).unwrap_err();
    assert!(matches!(err, EetError::InvalidReference(_)), "got {err:?}");
}

#[test]
fn ignore_invalid_cert_still_checks_digest() {
    let (_, _, bytes) = built_reference();
    let corrupted = String::from_utf8(bytes)
        .unwrap()
        .replace("celk_trzba=\"100.00\"", "celk_trzba=\"999.00\"");
    let options = ParseOptions {
        ignore_invalid_cert: true,
        now: Some(test_now()),
    };
    let err = parse_envelope(corrupted.as_bytes(), &options).unwrap_err();
    assert!(matches!(err, EetError::DigestMismatch), "got {err:?}");
}

#[test]
fn peer_certificate_organization_is_checked() {
    let reply = sign_envelope(
        unsigned_reply_element(TEST_FIK),
        &production_certificate(),
        &operator_key(),
        &EnvelopeOptions::default(),
    )
    .unwrap();
    let err = parse_envelope(&reply, &verify_opts()).unwrap_err();
    assert!(matches!(err, EetError::UntrustedPeer(_)), "got {err:?}");
}

#[test]
fn peer_certificate_validity_window_is_checked() {
    let (_, _, bytes) = built_reference();
    for when in ["2020-01-01T00:00:00Z", "2050-01-01T00:00:00Z"] {
        let options = ParseOptions {
            ignore_invalid_cert: false,
            now: Some(chrono::DateTime::parse_from_rfc3339(when).unwrap().to_utc()),
        };
        let err = parse_envelope(&bytes, &options).unwrap_err();
        assert!(matches!(err, EetError::ExpiredCertificate(_)), "got {err:?}");
    }
}

#[test]
fn duplicated_body_id_is_rejected() {
    let (_, _, bytes) = built_reference();
    // Append a decoy element reusing the signed wsu:Id inside the header.
    let tampered = String::from_utf8(bytes).unwrap().replace(
        "<soap:Header>",
        "<soap:Header><decoy xmlns:wsu=\"http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd\" wsu:Id=\"id-refbody\"></decoy>",
    );
    let err = parse_envelope(tampered.as_bytes(), &verify_opts()).unwrap_err();
    assert!(matches!(err, EetError::InvalidReference(_)), "got {err:?}");
}

// --- Response extraction ---

fn unsigned_reply_element(fik: &str) -> Element {
    Element::new(Some("eet"), ns::EET, "Odpoved")
        .child(
            Element::new(Some("eet"), ns::EET, "Hlavicka")
                .attr("uuid_zpravy", "b9bf4bd0-8a19-4b36-a4a1-7e6c41798e07")
                .attr("bkp", REFERENCE_BKP)
                .attr("dat_prij", "2027-03-01T12:00:01+01:00"),
        )
        .child(
            Element::new(Some("eet"), ns::EET, "Potvrzeni")
                .attr("fik", fik)
                .attr("test", "true"),
        )
}

fn unsigned_envelope(content: Element) -> Vec<u8> {
    Element::new(Some("soap"), ns::SOAP, "Envelope")
        .child(Element::new(Some("soap"), ns::SOAP, "Header"))
        .child(Element::new(Some("soap"), ns::SOAP, "Body").child(content))
        .canonicalize()
}

#[test]
fn signed_confirmation_parses_to_success() {
    let (_, record, _) = built_reference();
    let reply = authority_reply(&record, Reply::Confirm { fik: TEST_FIK });

    let response = parse_response(&reply, &verify_opts()).unwrap();
    assert!(response.is_success());
    assert_eq!(response.fiscal_id().unwrap().as_str(), TEST_FIK);
    assert_eq!(
        response.header.message_id,
        record.header.message_id
    );
    assert_eq!(
        response.header.short_code.as_ref().unwrap().as_str(),
        REFERENCE_BKP
    );
    assert!(response.header.accepted_at.is_some());
    assert!(response.error.is_none());
    assert!(response.warnings.is_empty());
}

#[test]
fn signed_rejection_parses_to_error() {
    let (_, record, _) = built_reference();
    let reply = authority_reply(
        &record,
        Reply::Error {
            code: -5,
            message: "Neplatny kontrolni podpisovy kod poplatnika (PKP)",
        },
    );

    let response = parse_response(&reply, &verify_opts()).unwrap();
    assert!(!response.is_success());
    let error = response.error.unwrap();
    assert_eq!(error.code.value(), -5);
    assert!(error.test);
    assert!(error.message.contains("PKP"));
}

#[test]
fn unsigned_document_skips_verification() {
    let bytes = unsigned_envelope(unsigned_reply_element(TEST_FIK));
    let envelope = parse_envelope(&bytes, &verify_opts()).unwrap();
    assert!(!envelope.verified);
    let response = parse_response(&bytes, &verify_opts()).unwrap();
    assert!(response.is_success());
}

#[test]
fn reply_with_both_payloads_is_protocol_illegal() {
    let both = unsigned_reply_element(TEST_FIK).child(
        Element::new(Some("eet"), ns::EET, "Chyba")
            .attr("kod", "-5")
            .text("rozpor"),
    );
    let err = parse_response(&unsigned_envelope(both), &verify_opts()).unwrap_err();
    assert!(matches!(err, EetError::Protocol(_)), "got {err:?}");
}

#[test]
fn warnings_are_collected_in_order() {
    let with_warnings = unsigned_reply_element(TEST_FIK)
        .child(
            Element::new(Some("eet"), ns::EET, "Varovani")
                .attr("kod_varov", "1")
                .text("DIC poplatnika v datove zprave se neshoduje s DIC v certifikatu"),
        )
        .child(
            Element::new(Some("eet"), ns::EET, "Varovani")
                .attr("kod_varov", "5")
                .text("Datum a cas prijeti trzby je vyrazne v budoucnosti"),
        );
    let response = parse_response(&unsigned_envelope(with_warnings), &verify_opts()).unwrap();
    assert_eq!(response.warnings.len(), 2);
    assert_eq!(response.warnings[0].code.value(), 1);
    assert_eq!(response.warnings[1].code.value(), 5);
}

#[test]
fn malformed_fik_in_reply_is_protocol_error() {
    let bad = unsigned_envelope(unsigned_reply_element("not-a-fik"));
    let err = parse_response(&bad, &verify_opts()).unwrap_err();
    assert!(matches!(err, EetError::Protocol(_)), "got {err:?}");
}

#[test]
fn body_without_reply_element_is_protocol_error() {
    let empty = unsigned_envelope(Element::new(Some("eet"), ns::EET, "Jiny"));
    let err = parse_response(&empty, &verify_opts()).unwrap_err();
    assert!(matches!(err, EetError::Protocol(_)), "got {err:?}");
}
