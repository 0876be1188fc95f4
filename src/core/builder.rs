use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;

use super::clock::{Clock, SystemClock};
use super::config::Config;
use super::error::{EetError, ValidationError};
use super::sale::{SaleData, SaleRecord};
use super::types::{Amount, ReceiptSeq, SaleDateTime};

/// Builder for sale records, seeded from a [`Config`].
///
/// Identifier and key material come from the config; the caller supplies
/// the per-sale fields. All range and pattern checks run at [`build`]
/// (SaleBuilder::build) — a record that constructs is protocol-legal.
///
/// ```no_run
/// # use trzba::core::*;
/// # use rust_decimal_macros::dec;
/// # fn demo(config: &Config) -> Result<SaleRecord, EetError> {
/// config
///     .sale("0/6460/ZQ42", dec!(236.00))
///     .standard_rate(dec!(195.04), dec!(40.96))
///     .build()
/// # }
/// ```
pub struct SaleBuilder {
    config: Config,
    receipt_seq: String,
    total: Decimal,
    recorded_at: Option<DateTime<FixedOffset>>,
    verification: bool,
    non_taxable_base: Option<Decimal>,
    standard_rate_base: Option<Decimal>,
    standard_rate_vat: Option<Decimal>,
    first_reduced_base: Option<Decimal>,
    first_reduced_vat: Option<Decimal>,
    second_reduced_base: Option<Decimal>,
    second_reduced_vat: Option<Decimal>,
    travel_service: Option<Decimal>,
    used_goods_standard: Option<Decimal>,
    used_goods_first_reduced: Option<Decimal>,
    used_goods_second_reduced: Option<Decimal>,
    later_drawdown_designated: Option<Decimal>,
    later_drawdown_settled: Option<Decimal>,
    clock: Box<dyn Clock>,
}

impl SaleBuilder {
    pub fn new(config: &Config, receipt_seq: impl Into<String>, total: Decimal) -> Self {
        Self {
            config: config.clone(),
            receipt_seq: receipt_seq.into(),
            total,
            recorded_at: None,
            verification: false,
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
            clock: Box::new(SystemClock),
        }
    }

    /// When the sale took place (dat_trzby). Defaults to the clock's
    /// "now".
    pub fn recorded_at(mut self, at: DateTime<FixedOffset>) -> Self {
        self.recorded_at = Some(at);
        self
    }

    /// Mark the record as a verification (dry-run) submission.
    pub fn verification(mut self, flag: bool) -> Self {
        self.verification = flag;
        self
    }

    /// Base not subject to VAT (zakl_nepodl_dph).
    pub fn non_taxable_base(mut self, base: Decimal) -> Self {
        self.non_taxable_base = Some(base);
        self
    }

    /// Standard-rate base and VAT (zakl_dan1 / dan1).
    pub fn standard_rate(mut self, base: Decimal, vat: Decimal) -> Self {
        self.standard_rate_base = Some(base);
        self.standard_rate_vat = Some(vat);
        self
    }

    /// First reduced-rate base and VAT (zakl_dan2 / dan2).
    pub fn first_reduced_rate(mut self, base: Decimal, vat: Decimal) -> Self {
        self.first_reduced_base = Some(base);
        self.first_reduced_vat = Some(vat);
        self
    }

    /// Second reduced-rate base and VAT (zakl_dan3 / dan3).
    pub fn second_reduced_rate(mut self, base: Decimal, vat: Decimal) -> Self {
        self.second_reduced_base = Some(base);
        self.second_reduced_vat = Some(vat);
        self
    }

    /// Travel service margin scheme amount (cest_sluz).
    pub fn travel_service(mut self, amount: Decimal) -> Self {
        self.travel_service = Some(amount);
        self
    }

    /// Used-goods margin amounts per rate band
    /// (pouzit_zboz1 / pouzit_zboz2 / pouzit_zboz3).
    pub fn used_goods(
        mut self,
        standard: Option<Decimal>,
        first_reduced: Option<Decimal>,
        second_reduced: Option<Decimal>,
    ) -> Self {
        self.used_goods_standard = standard;
        self.used_goods_first_reduced = first_reduced;
        self.used_goods_second_reduced = second_reduced;
        self
    }

    /// Amount designated for later drawdown (urceno_cerp_zuct).
    pub fn later_drawdown_designated(mut self, amount: Decimal) -> Self {
        self.later_drawdown_designated = Some(amount);
        self
    }

    /// Amount drawn down / settled (cerp_zuct).
    pub fn later_drawdown_settled(mut self, amount: Decimal) -> Self {
        self.later_drawdown_settled = Some(amount);
        self
    }

    /// Override the time source used for the default sale timestamp.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Validate every field and produce an unsent record.
    pub fn build(self) -> Result<SaleRecord, EetError> {
        let receipt_seq = ReceiptSeq::new(self.receipt_seq)?;
        let total = amount_field("celk_trzba", self.total)?;
        let recorded_at = SaleDateTime::new(
            self.recorded_at
                .unwrap_or_else(|| self.clock.now().fixed_offset()),
        );

        let mut data = SaleData::new(
            self.config.taxpayer_id().clone(),
            self.config.premises_id(),
            self.config.register_id().clone(),
            receipt_seq,
            recorded_at,
            total,
        );
        data.delegating_taxpayer_id = self.config.delegating_taxpayer_id().cloned();
        data.regime = self.config.regime();
        data.non_taxable_base = opt_amount("zakl_nepodl_dph", self.non_taxable_base)?;
        data.standard_rate_base = opt_amount("zakl_dan1", self.standard_rate_base)?;
        data.standard_rate_vat = opt_amount("dan1", self.standard_rate_vat)?;
        data.first_reduced_base = opt_amount("zakl_dan2", self.first_reduced_base)?;
        data.first_reduced_vat = opt_amount("dan2", self.first_reduced_vat)?;
        data.second_reduced_base = opt_amount("zakl_dan3", self.second_reduced_base)?;
        data.second_reduced_vat = opt_amount("dan3", self.second_reduced_vat)?;
        data.travel_service = opt_amount("cest_sluz", self.travel_service)?;
        data.used_goods_standard = opt_amount("pouzit_zboz1", self.used_goods_standard)?;
        data.used_goods_first_reduced = opt_amount("pouzit_zboz2", self.used_goods_first_reduced)?;
        data.used_goods_second_reduced =
            opt_amount("pouzit_zboz3", self.used_goods_second_reduced)?;
        data.later_drawdown_designated =
            opt_amount("urceno_cerp_zuct", self.later_drawdown_designated)?;
        data.later_drawdown_settled = opt_amount("cerp_zuct", self.later_drawdown_settled)?;

        Ok(SaleRecord::new(data, self.verification))
    }
}

fn amount_field(field: &'static str, value: Decimal) -> Result<Amount, ValidationError> {
    Amount::new(value).map_err(|e| e.for_field(field))
}

fn opt_amount(
    field: &'static str,
    value: Option<Decimal>,
) -> Result<Option<Amount>, ValidationError> {
    value.map(|v| amount_field(field, v)).transpose()
}
