use serde::{Deserialize, Serialize};

use super::types::{ErrorCode, FiscalId, MessageUuid, SaleDateTime, ShortCode, WarningCode};

/// Header echo of a parsed authority reply (schema `Hlavicka` on
/// `Odpoved`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseHeader {
    /// uuid_zpravy — echoes the submitted message id.
    pub message_id: Option<MessageUuid>,
    /// bkp — echoes the submitted short code.
    pub short_code: Option<ShortCode>,
    /// dat_prij — when the authority accepted the message.
    pub accepted_at: Option<SaleDateTime>,
    /// dat_odmit — when the authority rejected it.
    pub rejected_at: Option<SaleDateTime>,
}

/// Success payload (schema `Potvrzeni`): the issued FIK.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirmation {
    pub fiscal_id: FiscalId,
    /// Set on playground confirmations.
    pub test: bool,
}

/// Error payload (schema `Chyba`): a well-formed rejection. Terminal —
/// resubmitting an incorrect sale is a business decision, not a retry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationError {
    pub code: ErrorCode,
    pub test: bool,
    pub message: String,
}

/// Non-fatal warning attached to a reply (schema `Varovani`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,
}

/// A parsed, integrity-checked authority reply.
///
/// Exactly one of `confirmation` and `error` is present on a valid
/// reply; a document carrying both is rejected during parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub header: ResponseHeader,
    pub confirmation: Option<Confirmation>,
    pub error: Option<RegistrationError>,
    pub warnings: Vec<Warning>,
}

impl Response {
    /// A response is successful if and only if the authority issued a
    /// FIK.
    pub fn is_success(&self) -> bool {
        self.confirmation.is_some()
    }

    /// The issued FIK, when present.
    pub fn fiscal_id(&self) -> Option<&FiscalId> {
        self.confirmation.as_ref().map(|c| &c.fiscal_id)
    }
}
