//! Shared fixtures: a generated RSA-2048 operator key with a playground
//! and a production certificate, plus golden PKP/BKP values computed for
//! that key with openssl.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal_macros::dec;
use trzba::core::*;

pub const OPERATOR_KEY_PEM: &str = include_str!("../fixtures/operator_key.pem");
pub const PLAYGROUND_CERT_PEM: &str = include_str!("../fixtures/playground_cert.pem");
pub const PRODUCTION_CERT_PEM: &str = include_str!("../fixtures/production_cert.pem");

/// Expected codes for the reference sale signed with the fixture key.
pub const REFERENCE_BKP: &str = "CB684AB9-F317B411-06C79E74-91C660F6-119B4280";
pub const REFERENCE_PKP: &str = "eO/qnh82mvISwXwzLSrvC2YptR6KwNe8en9EZfnEJBLxdDjyyg/h/TVVGBPnet/MraJBoHbulDCYV8Yv6H7dB/Me8hhXqKHDTYCxS7ihkvVFljRAHVsqBpeumxvgMAtv+EdcHUH73aq0MtbMCd8mqy7D8cN+mxqQIamYeUDougNgBzsCQG03Xi2OH7T4TuyAk6EHTANoyBVmpcV7f20IkpF9B9dOcKMqCljvPjllO3Os8bX5jx4rjoJxwQGjjkXpYqJ1iCUrvoAj4pHhQDc2WAv20nTA1qtLmRbpz2KrTims3NY+z3HEj7MzHb/EMGtC+GADK+HI5RYay/Yg2PoZjg==";

pub fn operator_key() -> RsaPrivateKey {
    private_key_from_pem(OPERATOR_KEY_PEM).unwrap()
}

pub fn playground_certificate() -> Certificate {
    Certificate::from_pem(PLAYGROUND_CERT_PEM).unwrap()
}

pub fn production_certificate() -> Certificate {
    Certificate::from_pem(PRODUCTION_CERT_PEM).unwrap()
}

/// An instant inside both fixture certificates' validity windows.
pub fn test_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2027, 3, 1, 12, 0, 0).unwrap()
}

pub fn playground_config() -> Config {
    Config::new(
        playground_certificate(),
        operator_key(),
        TaxpayerId::new("CZ00000019").unwrap(),
        PremisesId::new(273).unwrap(),
        RegisterId::new("/5546/RO24").unwrap(),
    )
}

/// The sale from the protocol's published example: its signed text is
/// `CZ00000019|273|/5546/RO24|0/6460/ZQ42|2019-01-04T16:41:24+02:00|100.00`.
pub fn reference_record(config: &Config) -> SaleRecord {
    config
        .sale("0/6460/ZQ42", dec!(100))
        .recorded_at(DateTime::parse_from_rfc3339("2019-01-04T16:41:24+02:00").unwrap())
        .build()
        .unwrap()
}

/// What the stand-in authority should answer.
#[cfg(feature = "soap")]
#[derive(Clone, Copy)]
pub enum Reply {
    Confirm { fik: &'static str },
    Error { code: i16, message: &'static str },
}

/// A signed `Odpoved` envelope the way the gateway would produce one,
/// echoing the given message id and BKP.
#[cfg(feature = "soap")]
pub fn authority_reply_parts(message_id: &str, bkp: &str, reply: Reply) -> Vec<u8> {
    use trzba::soap::{EnvelopeOptions, dom::Element, ns, sign_envelope};

    let mut header = Element::new(Some("eet"), ns::EET, "Hlavicka")
        .attr("uuid_zpravy", message_id)
        .attr("bkp", bkp);
    header = match reply {
        Reply::Confirm { .. } => header.attr("dat_prij", "2027-03-01T12:00:01+01:00"),
        Reply::Error { .. } => header.attr("dat_odmit", "2027-03-01T12:00:01+01:00"),
    };

    let mut odpoved = Element::new(Some("eet"), ns::EET, "Odpoved").child(header);
    odpoved = match reply {
        Reply::Confirm { fik } => odpoved.child(
            Element::new(Some("eet"), ns::EET, "Potvrzeni")
                .attr("fik", fik)
                .attr("test", "true"),
        ),
        Reply::Error { code, message } => odpoved.child(
            Element::new(Some("eet"), ns::EET, "Chyba")
                .attr("kod", &code.to_string())
                .attr("test", "true")
                .text(message),
        ),
    };

    sign_envelope(
        odpoved,
        &playground_certificate(),
        &operator_key(),
        &EnvelopeOptions::default(),
    )
    .unwrap()
}

#[cfg(feature = "soap")]
pub fn authority_reply(record: &SaleRecord, reply: Reply) -> Vec<u8> {
    authority_reply_parts(
        &record.header.message_id.as_ref().unwrap().canonical(),
        record.codes.as_ref().unwrap().bkp.as_str(),
        reply,
    )
}

/// A valid FIK for confirmations.
pub const TEST_FIK: &str = "b3319d98-c6a6-4e21-b8e1-8c5f0b9a2d3c-ff";
