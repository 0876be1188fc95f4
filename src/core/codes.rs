//! PKP/BKP fiscal code computation.
//!
//! Both codes are deterministic functions of six sale fields and the
//! operator's private key; they go on the printed receipt whether or not
//! the registration ever reaches the authority. The signed text — field
//! order, `|` separator, canonical field rendering — is fixed by the
//! protocol and must not change between retries of the same record.

use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::sha2::Sha256;
use rsa::signature::{SignatureEncoding, Signer};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use super::error::EetError;
use super::sale::SaleData;
use super::types::{LongCode, ShortCode};

/// The offline code pair stamped into a record before first
/// transmission and never recomputed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalCodes {
    /// PKP — podpisový kód poplatníka.
    pub pkp: LongCode,
    /// BKP — bezpečnostní kód poplatníka.
    pub bkp: ShortCode,
}

/// The exact UTF-8 text the PKP signs: the six canonical fields joined
/// with `|` in schema order.
///
/// `CZ00000019|273|/5546/RO24|0/6460/ZQ42|2019-01-04T16:41:24+02:00|100.00`
pub fn signed_text(data: &SaleData) -> String {
    format!(
        "{}|{}|{}|{}|{}|{}",
        data.taxpayer_id.as_str(),
        data.premises_id.canonical(),
        data.register_id.as_str(),
        data.receipt_seq.as_str(),
        data.recorded_at.canonical(),
        data.total.canonical(),
    )
}

/// Compute the code pair: PKP = base64(RSASSA-PKCS1-v1_5/SHA-256 over
/// the signed text), BKP = grouped uppercase SHA-1 hex of the raw
/// signature bytes.
pub fn compute(data: &SaleData, key: &RsaPrivateKey) -> Result<FiscalCodes, EetError> {
    let text = signed_text(data);
    let signature = sign_sha256(key, text.as_bytes())?;
    let pkp = LongCode::from_signature(&signature)?;
    let digest: [u8; 20] = Sha1::digest(&signature).into();
    let bkp = ShortCode::from_digest(&digest);
    Ok(FiscalCodes { pkp, bkp })
}

/// RSASSA-PKCS1-v1_5 signature with SHA-256, shared between the PKP and
/// the envelope's XML signature.
pub(crate) fn sign_sha256(key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, EetError> {
    let signer = SigningKey::<Sha256>::new(key.clone());
    let signature = signer
        .try_sign(message)
        .map_err(|e| EetError::Crypto(format!("RSA signing failed: {e}")))?;
    Ok(signature.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::*;
    use rust_decimal_macros::dec;

    fn reference_data() -> SaleData {
        SaleData::new(
            TaxpayerId::new("CZ00000019").unwrap(),
            PremisesId::new(273).unwrap(),
            RegisterId::new("/5546/RO24").unwrap(),
            ReceiptSeq::new("0/6460/ZQ42").unwrap(),
            SaleDateTime::parse("2019-01-04T16:41:24+02:00").unwrap(),
            Amount::new(dec!(100)).unwrap(),
        )
    }

    #[test]
    fn signed_text_reference_vector() {
        assert_eq!(
            signed_text(&reference_data()),
            "CZ00000019|273|/5546/RO24|0/6460/ZQ42|2019-01-04T16:41:24+02:00|100.00"
        );
    }

    #[test]
    fn signed_text_renders_amount_with_two_digits() {
        let mut data = reference_data();
        data.total = Amount::new(dec!(0.5)).unwrap();
        assert!(signed_text(&data).ends_with("|0.50"));
    }
}
