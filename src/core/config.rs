use rsa::RsaPrivateKey;
use rust_decimal::Decimal;

use super::builder::SaleBuilder;
use super::cert::Certificate;
use super::types::{Mode, PremisesId, Regime, RegisterId, TaxpayerId};

/// Immutable binding of the operator's signing material and premises
/// identity. Every sale record is produced through a config so that the
/// identifiers on the wire always match the key that signed them.
///
/// The operating [`Mode`] is derived from the certificate issuer — a
/// playground certificate can never produce a production submission.
#[derive(Debug, Clone)]
pub struct Config {
    certificate: Certificate,
    private_key: RsaPrivateKey,
    taxpayer_id: TaxpayerId,
    delegating_taxpayer_id: Option<TaxpayerId>,
    premises_id: PremisesId,
    register_id: RegisterId,
    regime: Regime,
    mode: Mode,
}

impl Config {
    pub fn new(
        certificate: Certificate,
        private_key: RsaPrivateKey,
        taxpayer_id: TaxpayerId,
        premises_id: PremisesId,
        register_id: RegisterId,
    ) -> Self {
        let mode = Mode::from_issuer_cn(certificate.issuer_cn());
        Self {
            certificate,
            private_key,
            taxpayer_id,
            delegating_taxpayer_id: None,
            premises_id,
            register_id,
            regime: Regime::Standard,
            mode,
        }
    }

    /// Register sales on behalf of a delegating taxpayer
    /// (dic_poverujiciho).
    pub fn with_delegating_taxpayer(mut self, id: TaxpayerId) -> Self {
        self.delegating_taxpayer_id = Some(id);
        self
    }

    /// Premises granted the simplified regime report with rezim = 1.
    pub fn with_regime(mut self, regime: Regime) -> Self {
        self.regime = regime;
        self
    }

    /// Start a sale record for this config: the factory entry point.
    pub fn sale(&self, receipt_seq: impl Into<String>, total: Decimal) -> SaleBuilder {
        SaleBuilder::new(self, receipt_seq, total)
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    pub fn taxpayer_id(&self) -> &TaxpayerId {
        &self.taxpayer_id
    }

    pub fn delegating_taxpayer_id(&self) -> Option<&TaxpayerId> {
        self.delegating_taxpayer_id.as_ref()
    }

    pub fn premises_id(&self) -> PremisesId {
        self.premises_id
    }

    pub fn register_id(&self) -> &RegisterId {
        &self.register_id
    }

    pub fn regime(&self) -> Regime {
        self.regime
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }
}
