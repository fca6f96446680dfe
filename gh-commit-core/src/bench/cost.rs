// cost estimation under provider list prices or unified billing multipliers

use super::pricing::{MultiplierRate, ProviderRate, RateRecord};
use super::tokens::TokenEstimate;

/// default price of one token unit in usd (multiplier mode)
pub const DEFAULT_UNIT_PRICE: f64 = 0.00001;

/// a cost computed for one trial, carrying the rate it was computed from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostEstimate<'a> {
    Provider {
        rate: &'a ProviderRate,
        cost: f64,
    },
    Multiplier {
        rate: &'a MultiplierRate,
        unit_price: f64,
        token_units: f64,
        /// blank when both multipliers are zero, even though token units are reported
        cost: Option<f64>,
    },
}

impl CostEstimate<'_> {
    pub fn cost(&self) -> Option<f64> {
        match self {
            CostEstimate::Provider { cost, .. } => Some(*cost),
            CostEstimate::Multiplier { cost, .. } => *cost,
        }
    }
}

/// combine token estimates with a resolved rate
pub fn compute(tokens: TokenEstimate, rate: RateRecord<'_>, unit_price: f64) -> CostEstimate<'_> {
    match rate {
        RateRecord::Provider(rate) => CostEstimate::Provider {
            rate,
            cost: provider_cost(tokens, rate),
        },
        RateRecord::Multiplier(rate) => {
            let token_units = tokens.input as f64 * rate.input_multiplier
                + tokens.output as f64 * rate.output_multiplier;
            let cost = (rate.input_multiplier + rate.output_multiplier > 0.0)
                .then(|| token_units * unit_price);
            CostEstimate::Multiplier {
                rate,
                unit_price,
                token_units,
                cost,
            }
        }
    }
}

fn provider_cost(tokens: TokenEstimate, rate: &ProviderRate) -> f64 {
    (tokens.input as f64 / 1000.0) * rate.in_per_1k
        + (tokens.output as f64 / 1000.0) * rate.out_per_1k
}

/// derived values: six fractional digits, never scientific notation
pub fn format_fixed(value: f64) -> String {
    format!("{value:.6}")
}

/// configured rates are echoed in their shortest decimal form
pub fn format_rate(value: f64) -> String {
    value.to_string()
}
