use serde::{Deserialize, Serialize};

use super::codes::FiscalCodes;
use super::types::*;

/// Message header of one registration (schema `Hlavicka`).
///
/// `message_id` and `sent_at` are stamped by the envelope codec
/// immediately before transmission; `first_submission` is cleared by the
/// scheduler when a record enters the retry queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleHeader {
    /// uuid_zpravy — stamped on first build, kept across retries.
    pub message_id: Option<MessageUuid>,
    /// dat_odesl — refreshed on every build.
    pub sent_at: Option<SaleDateTime>,
    /// prvni_zaslani — `true` until the first failed attempt.
    pub first_submission: bool,
    /// overeni — verification (dry-run) submission flag.
    pub verification: bool,
}

/// The reported sale itself (schema `Data`).
///
/// The six required fields feed the signed text in this order:
/// dic_popl, id_provoz, id_pokl, porad_cis, dat_trzby, celk_trzba.
/// The optional amounts break the total down by VAT treatment; absent
/// ones are omitted from the wire format entirely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleData {
    /// dic_popl — taxpayer registered for the sale.
    pub taxpayer_id: TaxpayerId,
    /// dic_poverujiciho — delegating taxpayer, when registering on
    /// someone else's behalf.
    pub delegating_taxpayer_id: Option<TaxpayerId>,
    /// id_provoz.
    pub premises_id: PremisesId,
    /// id_pokl.
    pub register_id: RegisterId,
    /// porad_cis.
    pub receipt_seq: ReceiptSeq,
    /// dat_trzby — when the sale took place.
    pub recorded_at: SaleDateTime,
    /// celk_trzba — total amount of the sale.
    pub total: Amount,
    /// zakl_nepodl_dph — base not subject to VAT.
    pub non_taxable_base: Option<Amount>,
    /// zakl_dan1 — standard-rate VAT base.
    pub standard_rate_base: Option<Amount>,
    /// dan1 — standard-rate VAT.
    pub standard_rate_vat: Option<Amount>,
    /// zakl_dan2 — first reduced-rate VAT base.
    pub first_reduced_base: Option<Amount>,
    /// dan2 — first reduced-rate VAT.
    pub first_reduced_vat: Option<Amount>,
    /// zakl_dan3 — second reduced-rate VAT base.
    pub second_reduced_base: Option<Amount>,
    /// dan3 — second reduced-rate VAT.
    pub second_reduced_vat: Option<Amount>,
    /// cest_sluz — travel service margin scheme.
    pub travel_service: Option<Amount>,
    /// pouzit_zboz1 — used goods, standard rate.
    pub used_goods_standard: Option<Amount>,
    /// pouzit_zboz2 — used goods, first reduced rate.
    pub used_goods_first_reduced: Option<Amount>,
    /// pouzit_zboz3 — used goods, second reduced rate.
    pub used_goods_second_reduced: Option<Amount>,
    /// urceno_cerp_zuct — designated for later drawdown (vouchers).
    pub later_drawdown_designated: Option<Amount>,
    /// cerp_zuct — drawn down / settled.
    pub later_drawdown_settled: Option<Amount>,
    /// rezim.
    pub regime: Regime,
}

impl SaleData {
    /// A record with the six required fields set and every optional
    /// breakdown absent.
    pub fn new(
        taxpayer_id: TaxpayerId,
        premises_id: PremisesId,
        register_id: RegisterId,
        receipt_seq: ReceiptSeq,
        recorded_at: SaleDateTime,
        total: Amount,
    ) -> Self {
        Self {
            taxpayer_id,
            delegating_taxpayer_id: None,
            premises_id,
            register_id,
            receipt_seq,
            recorded_at,
            total,
            non_taxable_base: None,
            standard_rate_base: None,
            standard_rate_vat: None,
            first_reduced_base: None,
            first_reduced_vat: None,
            second_reduced_base: None,
            second_reduced_vat: None,
            travel_service: None,
            used_goods_standard: None,
            used_goods_first_reduced: None,
            used_goods_second_reduced: None,
            later_drawdown_designated: None,
            later_drawdown_settled: None,
            regime: Regime::Standard,
        }
    }

    /// The optional breakdown amounts paired with their schema
    /// attribute names, in schema order.
    pub fn optional_amounts(&self) -> [(&'static str, Option<&Amount>); 13] {
        [
            ("zakl_nepodl_dph", self.non_taxable_base.as_ref()),
            ("zakl_dan1", self.standard_rate_base.as_ref()),
            ("dan1", self.standard_rate_vat.as_ref()),
            ("zakl_dan2", self.first_reduced_base.as_ref()),
            ("dan2", self.first_reduced_vat.as_ref()),
            ("zakl_dan3", self.second_reduced_base.as_ref()),
            ("dan3", self.second_reduced_vat.as_ref()),
            ("cest_sluz", self.travel_service.as_ref()),
            ("pouzit_zboz1", self.used_goods_standard.as_ref()),
            ("pouzit_zboz2", self.used_goods_first_reduced.as_ref()),
            ("pouzit_zboz3", self.used_goods_second_reduced.as_ref()),
            ("urceno_cerp_zuct", self.later_drawdown_designated.as_ref()),
            ("cerp_zuct", self.later_drawdown_settled.as_ref()),
        ]
    }
}

/// One reportable transaction plus its header and — once built — the
/// offline code pair.
///
/// Codes are computed exactly once, lazily, before first transmission;
/// recomputing them on retry would change the signed text the receipt
/// already printed, so the codec never touches populated codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub header: SaleHeader,
    pub data: SaleData,
    pub codes: Option<FiscalCodes>,
}

impl SaleRecord {
    /// A fresh, unsent record.
    pub fn new(data: SaleData, verification: bool) -> Self {
        Self {
            header: SaleHeader {
                message_id: None,
                sent_at: None,
                first_submission: true,
                verification,
            },
            data,
            codes: None,
        }
    }
}
