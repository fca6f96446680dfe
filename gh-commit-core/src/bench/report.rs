// csv report: the column set is chosen once from the pricing mode and never changes

use std::io::{self, Write};

use super::cost::{CostEstimate, format_fixed, format_rate};
use super::pricing::PricingMode;
use super::tokens::TokenEstimate;
use super::trial::Trial;

const BASE_COLUMNS: [&str; 8] = [
    "Model",
    "Run",
    "Millis",
    "Status",
    "InChars",
    "OutChars",
    "EstInTokens",
    "EstOutTokens",
];

const PROVIDER_COLUMNS: [&str; 3] = ["PriceInPer1k", "PriceOutPer1k", "EstCostUSD"];

const MULTIPLIER_COLUMNS: [&str; 5] = [
    "InputMult",
    "OutputMult",
    "UnitPrice",
    "TokenUnits",
    "EstCostUSD",
];

fn cost_columns(mode: PricingMode) -> &'static [&'static str] {
    match mode {
        PricingMode::None => &[],
        PricingMode::Provider => &PROVIDER_COLUMNS,
        PricingMode::Multiplier => &MULTIPLIER_COLUMNS,
    }
}

/// ordered column names for a pricing mode
pub fn header(mode: PricingMode) -> Vec<&'static str> {
    BASE_COLUMNS
        .iter()
        .chain(cost_columns(mode))
        .copied()
        .collect()
}

/// field values for one trial, always exactly `header(mode).len()` of them
pub fn row(
    mode: PricingMode,
    trial: &Trial,
    tokens: TokenEstimate,
    estimate: Option<&CostEstimate<'_>>,
) -> Vec<String> {
    let mut fields = vec![
        trial.model.clone(),
        trial.run_index.to_string(),
        trial.elapsed_ms.to_string(),
        trial.status.to_string(),
        trial.in_chars.to_string(),
        trial.out_chars.to_string(),
        tokens.input.to_string(),
        tokens.output.to_string(),
    ];

    match (mode, estimate) {
        (PricingMode::None, _) => {}
        (PricingMode::Provider, Some(CostEstimate::Provider { rate, cost })) => {
            fields.push(format_rate(rate.in_per_1k));
            fields.push(format_rate(rate.out_per_1k));
            fields.push(format_fixed(*cost));
        }
        (
            PricingMode::Multiplier,
            Some(CostEstimate::Multiplier {
                rate,
                unit_price,
                token_units,
                cost,
            }),
        ) => {
            fields.push(format_rate(rate.input_multiplier));
            fields.push(format_rate(rate.output_multiplier));
            fields.push(format_rate(*unit_price));
            fields.push(format_fixed(*token_units));
            fields.push((*cost).map(format_fixed).unwrap_or_default());
        }
        // no usable rate for this model
        (mode, _) => fields.extend(cost_columns(mode).iter().map(|_| String::new())),
    }

    fields
}

/// writes the header once, then one complete line per trial
pub struct ReportEmitter<W: Write> {
    out: W,
    mode: PricingMode,
    header_written: bool,
}

impl<W: Write> ReportEmitter<W> {
    pub fn new(out: W, mode: PricingMode) -> Self {
        Self {
            out,
            mode,
            header_written: false,
        }
    }

    pub fn mode(&self) -> PricingMode {
        self.mode
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        if self.header_written {
            return Ok(());
        }
        writeln!(self.out, "{}", header(self.mode).join(","))?;
        self.out.flush()?;
        self.header_written = true;
        Ok(())
    }

    pub fn write_row(
        &mut self,
        trial: &Trial,
        tokens: TokenEstimate,
        estimate: Option<&CostEstimate<'_>>,
    ) -> io::Result<()> {
        self.write_header()?;
        // the line is fully formatted before anything is written
        let line = row(self.mode, trial, tokens, estimate).join(",");
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
