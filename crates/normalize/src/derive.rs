//! Per-record derived fields: currency rounding, GCI, legacy flag, text
//! normalization, estimated agent total, house profit per agent, and the
//! unified close date.
//!
//! Which columns exist is a property of the whole dataset, so every "if
//! absent" decision is made once in [`FieldDeriver::new`]. `derive` then runs
//! per record without looking at other records.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::{NormalizeConfig, Replacement, TextConfig};
use crate::model::{round2, Cell, DealSplitRecord};

/// Source and derived field names the deriver reads or writes.
pub mod fields {
    pub const FEE_AMOUNT: &str = "Fee Amount";
    pub const SPLIT_WITH_HOUSE: &str = "Split with House";
    pub const SPLIT_BETWEEN_AGENTS: &str = "Split between Agents";
    pub const GCI: &str = "GCI";
    pub const LEGACY_DEAL: &str = "Legacy Deal";
    pub const TOTAL_FOR_AGENT: &str = "Total for Agent";
    pub const ESTIMATED_TOTAL_FOR_AGENT: &str = "Estimated Total for Agent";
    pub const TOTAL_TO_HOUSE_FROM_AGENT: &str = "Total to House from Agent";
    pub const TOTAL_TO_HOUSE_BY_AGENT: &str = "Total to House by Agent";
    pub const DEDUCTION_OFF_TOP: &str = "Deduction off the top";
    pub const OTHER_DEDUCTIONS: &str = "Other Deductions (If any)";
    pub const MARKETING_DEDUCTIONS: &str = "Marketing Deductions (if any)";
    pub const OVERRIDE_AMOUNT: &str = "Override Amount";
    pub const DEAL_DATE: &str = "Deal Date";
    pub const UNIFIED_DEAL_CLOSE_DATE: &str = "Unified Deal Close Date";
}

use fields::*;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GciStrategy {
    /// Source already has a GCI column.
    Provided,
    /// `fee × split_with_house% × split_between_agents%`.
    Computed,
    /// Operand columns missing; no GCI is produced.
    Unavailable,
}

/// How "Total to House from Agent" is obtained for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HouseProfitStrategy {
    /// Source already carries the derived column; kept as a number (0 fallback).
    Provided,
    /// Source has "Total to House by Agent"; passed through (0 fallback).
    SourceColumn,
    /// Computed from fee, splits and deductions.
    Formula,
    /// Fee / split columns missing; 0 for every record.
    Unavailable,
}

impl HouseProfitStrategy {
    pub fn evaluate(&self, record: &DealSplitRecord) -> f64 {
        match self {
            Self::Provided => record.number_or_zero(TOTAL_TO_HOUSE_FROM_AGENT),
            Self::SourceColumn => record.number_or_zero(TOTAL_TO_HOUSE_BY_AGENT),
            Self::Formula => house_profit(&HouseProfitInputs::from_record(record)),
            Self::Unavailable => 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Formulas
// ---------------------------------------------------------------------------

/// Gross commission income, rounded to cents.
pub fn gci(fee_amount: f64, split_with_house_pct: f64, split_between_agents_pct: f64) -> f64 {
    round2(fee_amount * (split_with_house_pct / 100.0) * (split_between_agents_pct / 100.0))
}

/// Operands of the house-profit formula. Missing values are 0.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HouseProfitInputs {
    pub fee_amount: f64,
    pub deduction_off_top: f64,
    pub other_deductions: f64,
    pub split_with_house_pct: f64,
    pub split_between_agents_pct: f64,
    pub marketing_deductions: f64,
    pub override_amount: f64,
}

impl HouseProfitInputs {
    pub fn from_record(record: &DealSplitRecord) -> Self {
        Self {
            fee_amount: record.number_or_zero(FEE_AMOUNT),
            deduction_off_top: record.number_or_zero(DEDUCTION_OFF_TOP),
            other_deductions: record.number_or_zero(OTHER_DEDUCTIONS),
            split_with_house_pct: record.number_or_zero(SPLIT_WITH_HOUSE),
            split_between_agents_pct: record.number_or_zero(SPLIT_BETWEEN_AGENTS),
            marketing_deductions: record.number_or_zero(MARKETING_DEDUCTIONS),
            override_amount: record.number_or_zero(OVERRIDE_AMOUNT),
        }
    }
}

/// House profit attributable to one agent's share of a deal.
///
/// The house keeps `100 - split_with_house` percent of the net fee; the
/// agent-specific marketing deductions and override reduce it afterwards.
pub fn house_profit(inputs: &HouseProfitInputs) -> f64 {
    let net = inputs.fee_amount - inputs.deduction_off_top - inputs.other_deductions;
    let base = net
        * ((100.0 - inputs.split_with_house_pct) / 100.0)
        * (inputs.split_between_agents_pct / 100.0);
    round2(base - inputs.marketing_deductions - inputs.override_amount)
}

/// Apply replacements in order as plain substring substitutions.
pub fn normalize_text(value: &str, replacements: &[Replacement]) -> String {
    replacements
        .iter()
        .fold(value.to_string(), |acc, r| acc.replace(&r.find, &r.with))
}

// ---------------------------------------------------------------------------
// Deriver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeriveStats {
    /// Non-empty currency values that could not be parsed.
    pub coercion_failures: usize,
}

pub struct FieldDeriver<'a> {
    currency_fields: Vec<&'a str>,
    text: &'a TextConfig,
    legacy_deal_value: Option<&'a str>,
    gci: GciStrategy,
    copy_estimated_total: bool,
    house_profit: HouseProfitStrategy,
    has_unified_date: bool,
}

impl<'a> FieldDeriver<'a> {
    /// Decide every per-run strategy from the source header.
    pub fn new(config: &'a NormalizeConfig, headers: &[String]) -> Self {
        let present: HashSet<&str> = headers.iter().map(String::as_str).collect();
        let has = |name: &str| present.contains(name);
        let has_operands = has(FEE_AMOUNT) && has(SPLIT_WITH_HOUSE) && has(SPLIT_BETWEEN_AGENTS);

        let currency_fields = config
            .source
            .currency_fields
            .iter()
            .map(String::as_str)
            .filter(|f| present.contains(*f))
            .collect();

        let gci = if has(GCI) {
            GciStrategy::Provided
        } else if has_operands {
            log::info!("Added calculated GCI column");
            GciStrategy::Computed
        } else {
            log::warn!("Could not calculate GCI - missing required columns");
            GciStrategy::Unavailable
        };

        let legacy_deal_value = if has(LEGACY_DEAL) {
            None
        } else {
            log::info!("Added Legacy Deal column");
            Some(config.derived.legacy_deal_value.as_str())
        };

        let copy_estimated_total = !has(ESTIMATED_TOTAL_FOR_AGENT) && has(TOTAL_FOR_AGENT);
        if copy_estimated_total {
            log::info!("Added Estimated Total for Agent column");
        }

        let house_profit = if has(TOTAL_TO_HOUSE_FROM_AGENT) {
            HouseProfitStrategy::Provided
        } else if !has_operands {
            log::warn!("Could not calculate Total to House from Agent - missing required columns");
            HouseProfitStrategy::Unavailable
        } else if has(TOTAL_TO_HOUSE_BY_AGENT) {
            log::info!("Added Total to House from Agent column (using source values)");
            HouseProfitStrategy::SourceColumn
        } else {
            log::info!("Added Total to House from Agent column (calculated using formula)");
            HouseProfitStrategy::Formula
        };

        let has_unified_date = has(UNIFIED_DEAL_CLOSE_DATE);
        if !has_unified_date && !has(DEAL_DATE) {
            log::warn!("Deal Date column not found - Unified Deal Close Date will be empty");
        }

        Self {
            currency_fields,
            text: &config.text,
            legacy_deal_value,
            gci,
            copy_estimated_total,
            house_profit,
            has_unified_date,
        }
    }

    pub fn gci_strategy(&self) -> GciStrategy {
        self.gci
    }

    pub fn house_profit_strategy(&self) -> HouseProfitStrategy {
        self.house_profit
    }

    pub fn derive(&self, record: &mut DealSplitRecord) -> DeriveStats {
        let mut stats = DeriveStats::default();

        for &field in &self.currency_fields {
            let cell = match record.get(field) {
                Some(Cell::Number(v)) => Cell::Number(round2(*v)),
                Some(Cell::Text(raw)) => match crate::model::parse_number(raw) {
                    Some(v) => Cell::Number(round2(v)),
                    None => {
                        if !raw.trim().is_empty() {
                            log::debug!(
                                "row {}: '{field}' value '{raw}' is not numeric",
                                record.source_row + 1
                            );
                            stats.coercion_failures += 1;
                        }
                        Cell::Empty
                    }
                },
                Some(Cell::Empty) | None => Cell::Empty,
            };
            record.set(field, cell);
        }

        if self.gci == GciStrategy::Computed {
            let value = gci(
                record.number_or_zero(FEE_AMOUNT),
                record.number_or_zero(SPLIT_WITH_HOUSE),
                record.number_or_zero(SPLIT_BETWEEN_AGENTS),
            );
            record.set(GCI, Cell::Number(value));
        }

        if let Some(value) = self.legacy_deal_value {
            record.set(LEGACY_DEAL, Cell::Text(value.to_string()));
        }

        if !self.text.replace.is_empty() {
            for (name, cell) in record.cells_mut() {
                if let Cell::Text(s) = cell {
                    if self.text.applies_to(name) {
                        *s = normalize_text(s, &self.text.replace);
                    }
                }
            }
        }

        if self.copy_estimated_total {
            let copy = record.get(TOTAL_FOR_AGENT).cloned().unwrap_or(Cell::Empty);
            record.set(ESTIMATED_TOTAL_FOR_AGENT, copy);
        }

        let house = self.house_profit.evaluate(record);
        record.set(TOTAL_TO_HOUSE_FROM_AGENT, Cell::Number(house));

        if !self.has_unified_date {
            let date = record.get(DEAL_DATE).cloned().unwrap_or(Cell::Empty);
            record.set(UNIFIED_DEAL_CLOSE_DATE, date);
        }

        stats
    }
}
