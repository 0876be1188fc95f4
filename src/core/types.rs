use chrono::{DateTime, FixedOffset, SecondsFormat, Timelike};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::error::ValidationError;

/// Characters permitted in register and receipt identifiers
/// (schema `string20` / `string25`).
fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | ',' | ':' | ';' | '/' | '#' | '-' | '_' | ' ')
}

fn all_ascii_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Canonical schema rendering of a boolean attribute.
#[cfg(feature = "soap")]
pub(crate) fn canonical_bool(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

/// Display-through-`as_str` for string-backed value types.
macro_rules! fmt_as_str {
    () => {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(self.as_str())
        }
    };
}

/// Taxpayer identifier — DIČ (schema `CZDICType`, e.g. `CZ00000019`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxpayerId(String);

impl TaxpayerId {
    /// `CZ` followed by 8–10 digits.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let digits = value.strip_prefix("CZ").unwrap_or("");
        if !value.starts_with("CZ")
            || !(8..=10).contains(&digits.len())
            || !digits.chars().all(|c| c.is_ascii_digit())
        {
            return Err(ValidationError::new(
                "dic_popl",
                format!("{value:?} does not match CZ[0-9]{{8,10}}"),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaxpayerId {
    fmt_as_str!();
}

/// Premises identifier — id_provoz (schema `IdProvozType`, 1–999999).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremisesId(u32);

impl PremisesId {
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if !(1..=999_999).contains(&value) {
            return Err(ValidationError::new(
                "id_provoz",
                format!("{value} is outside 1..=999999"),
            ));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Canonical form used in the signed text and XML attributes.
    pub fn canonical(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for PremisesId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cash register identifier — id_pokl (schema `string20`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterId(String);

impl RegisterId {
    /// 1–20 characters of `[0-9a-zA-Z.,:;/#\-_ ]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() || value.len() > 20 || !value.chars().all(is_identifier_char) {
            return Err(ValidationError::new(
                "id_pokl",
                format!("{value:?} does not match string20"),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegisterId {
    fmt_as_str!();
}

/// Receipt sequence number — porad_cis (schema `string25`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptSeq(String);

impl ReceiptSeq {
    /// 1–25 characters of `[0-9a-zA-Z.,:;/#\-_ ]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.is_empty() || value.len() > 25 || !value.chars().all(is_identifier_char) {
            return Err(ValidationError::new(
                "porad_cis",
                format!("{value:?} does not match string25"),
            ));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ReceiptSeq {
    fmt_as_str!();
}

/// Monetary amount — CZK with two fraction digits (schema `CastkaType`).
///
/// Construction rounds to two decimal places (midpoint away from zero)
/// and enforces the open interval (−100 000 000, 100 000 000). The
/// canonical form always carries exactly two fraction digits because it
/// feeds the signed text and the XML attributes verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let limit = Decimal::from(100_000_000_u32);
        if rounded <= -limit || rounded >= limit {
            return Err(ValidationError::new(
                "castka",
                format!("{value} is outside (-100000000, 100000000)"),
            ));
        }
        rounded.rescale(2);
        Ok(Self(rounded))
    }

    /// Parse a decimal string (e.g. `"100.00"`, `"-3"`, `"0.005"`).
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let value = Decimal::from_str(text).map_err(|_| {
            ValidationError::new("castka", format!("{text:?} is not a decimal number"))
        })?;
        Self::new(value)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Canonical form, exactly two fraction digits (`"100.00"`).
    pub fn canonical(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// An instant with timezone, second precision (schema `dateTime`).
///
/// Canonical form is RFC 3339 with numeric offset, e.g.
/// `2019-01-04T16:41:24+02:00`. Sub-second precision is dropped at
/// construction so that equality and the signed text agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDateTime(DateTime<FixedOffset>);

impl SaleDateTime {
    pub fn new(at: DateTime<FixedOffset>) -> Self {
        Self(at.with_nanosecond(0).unwrap_or(at))
    }

    /// Parse an RFC 3339 timestamp.
    pub fn parse(text: &str) -> Result<Self, ValidationError> {
        let at = DateTime::parse_from_rfc3339(text).map_err(|e| {
            ValidationError::new("dateTime", format!("{text:?} is not RFC 3339: {e}"))
        })?;
        Ok(Self::new(at))
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.0
    }

    /// Canonical form with seconds precision and numeric offset.
    pub fn canonical(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Secs, false)
    }
}

impl From<DateTime<FixedOffset>> for SaleDateTime {
    fn from(at: DateTime<FixedOffset>) -> Self {
        Self::new(at)
    }
}

impl fmt::Display for SaleDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.canonical())
    }
}

/// Operating environment, derived from the operator certificate issuer —
/// never caller-supplied, to prevent production/playground mix-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    /// Live registration against the production gateway.
    Production,
    /// Non-binding registration against the playground gateway.
    Playground,
}

impl Mode {
    /// Playground operator certificates are issued by the `EET CA 1
    /// Playground` authority; anything else is treated as production.
    pub fn from_issuer_cn(issuer_cn: &str) -> Self {
        if issuer_cn.contains("Playground") {
            Self::Playground
        } else {
            Self::Production
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

/// Reporting regime — rezim (schema `RezimType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Regime {
    /// Common regime (`0`).
    #[default]
    Standard,
    /// Simplified regime (`1`), for premises granted an exception.
    Simplified,
}

impl Regime {
    pub fn canonical(&self) -> &'static str {
        match self {
            Self::Standard => "0",
            Self::Simplified => "1",
        }
    }
}

/// Message identifier — uuid_zpravy (schema `UUIDType`), a v4 UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageUuid(Uuid);

impl MessageUuid {
    /// Validate the 36-character textual form including the version and
    /// variant nibbles.
    pub fn new(text: &str) -> Result<Self, ValidationError> {
        if text.len() != 36 {
            return Err(ValidationError::new(
                "uuid_zpravy",
                format!("{text:?} is not 36 chars long"),
            ));
        }
        let uuid = Uuid::parse_str(text).map_err(|_| {
            ValidationError::new("uuid_zpravy", format!("{text:?} is not a valid UUID"))
        })?;
        if uuid.get_version_num() != 4 || uuid.get_variant() != uuid::Variant::RFC4122 {
            return Err(ValidationError::new(
                "uuid_zpravy",
                format!("{text:?} is not a version-4 RFC 4122 UUID"),
            ));
        }
        Ok(Self(uuid))
    }

    /// Fresh random message id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    pub fn canonical(&self) -> String {
        self.0.hyphenated().to_string()
    }
}

impl fmt::Display for MessageUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// PKP — the long offline code (schema `PkpType`): the base64-encoded
/// RSA-2048 signature over the six canonical sale fields, 344 characters
/// ending in `==`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongCode(String);

impl LongCode {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        let value = value.into();
        if value.len() != 344 || !value.ends_with("==") {
            return Err(ValidationError::new(
                "pkp",
                format!("{} chars, expected 344 ending in ==", value.len()),
            ));
        }
        let decoded = STANDARD
            .decode(&value)
            .map_err(|_| ValidationError::new("pkp", "not valid base64"))?;
        if decoded.len() != 256 {
            return Err(ValidationError::new(
                "pkp",
                format!("decodes to {} bytes, expected 256", decoded.len()),
            ));
        }
        Ok(Self(value))
    }

    /// Encode the raw 256-byte RSA signature.
    pub fn from_signature(signature: &[u8]) -> Result<Self, ValidationError> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        if signature.len() != 256 {
            return Err(ValidationError::new(
                "pkp",
                format!("{} signature bytes, expected 256", signature.len()),
            ));
        }
        Ok(Self(STANDARD.encode(signature)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LongCode {
    fmt_as_str!();
}

/// BKP — the short offline code (schema `BkpType`): the SHA-1 digest of
/// the raw PKP signature bytes as five uppercase 8-hex-digit groups
/// joined by hyphens, 44 characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortCode(String);

impl ShortCode {
    /// Accepts upper- or lowercase hex; stores the canonical uppercase
    /// form.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let groups: Vec<&str> = value.split('-').collect();
        if value.len() != 44
            || groups.len() != 5
            || groups.iter().any(|g| g.len() != 8 || !all_ascii_hex(g))
        {
            return Err(ValidationError::new(
                "bkp",
                format!("{value:?} is not five hyphenated 8-hex-digit groups"),
            ));
        }
        Ok(Self(value.to_ascii_uppercase()))
    }

    /// Format a 20-byte SHA-1 digest.
    pub fn from_digest(digest: &[u8; 20]) -> Self {
        let hex = hex::encode(digest).to_ascii_uppercase();
        let grouped = hex
            .as_bytes()
            .chunks(8)
            .map(|c| std::str::from_utf8(c).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("-");
        Self(grouped)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShortCode {
    fmt_as_str!();
}

/// FIK — the fiscal identification code issued by the authority (schema
/// `FikType`): a v4-UUID shape plus a 2-hex-digit suffix, 39 characters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalId(String);

impl FiscalId {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let err = || ValidationError::new("fik", format!("{value:?} is not a valid FIK"));
        if value.len() != 39 {
            return Err(err());
        }
        let groups: Vec<&str> = value.split('-').collect();
        let lens = [8, 4, 4, 4, 12, 2];
        if groups.len() != 6
            || groups
                .iter()
                .zip(lens)
                .any(|(g, l)| g.len() != l || !all_ascii_hex(g))
        {
            return Err(err());
        }
        if !groups[2].starts_with('4') || !matches!(groups[3].as_bytes()[0], b'8'..=b'9' | b'a'..=b'b' | b'A'..=b'B') {
            return Err(err());
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FiscalId {
    fmt_as_str!();
}

/// Authority error code — kod on `Chyba`, −999..=999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorCode(i16);

impl ErrorCode {
    pub fn new(code: i16) -> Result<Self, ValidationError> {
        if !(-999..=999).contains(&code) {
            return Err(ValidationError::new(
                "kod",
                format!("{code} is outside -999..=999"),
            ));
        }
        Ok(Self(code))
    }

    pub fn value(&self) -> i16 {
        self.0
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authority warning code — kod_varov on `Varovani`, 1..=999.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningCode(i16);

impl WarningCode {
    pub fn new(code: i16) -> Result<Self, ValidationError> {
        if !(1..=999).contains(&code) {
            return Err(ValidationError::new(
                "kod_varov",
                format!("{code} is outside 1..=999"),
            ));
        }
        Ok(Self(code))
    }

    pub fn value(&self) -> i16 {
        self.0
    }
}

impl fmt::Display for WarningCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
