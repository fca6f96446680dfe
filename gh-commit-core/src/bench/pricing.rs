// rate table loading and per-model rate lookup

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::PricingError;

/// which rate table drives the cost columns for this run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingMode {
    None,
    Provider,
    Multiplier,
}

impl PricingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingMode::None => "none",
            PricingMode::Provider => "provider",
            PricingMode::Multiplier => "multiplier",
        }
    }
}

/// provider list price per 1000 tokens
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRate {
    pub in_per_1k: f64,
    pub out_per_1k: f64,
    pub source: String,
}

/// unified billing multipliers; a missing multiplier is stored as zero
#[derive(Debug, Clone, PartialEq)]
pub struct MultiplierRate {
    pub input_multiplier: f64,
    pub output_multiplier: f64,
    pub source: String,
}

/// a resolved rate for one model
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateRecord<'a> {
    Provider(&'a ProviderRate),
    Multiplier(&'a MultiplierRate),
}

/// the rate table in effect for the whole run
#[derive(Debug, Clone, Default)]
pub enum Pricing {
    #[default]
    None,
    Provider(HashMap<String, ProviderRate>),
    Multiplier(HashMap<String, MultiplierRate>),
}

// json shapes as they appear on disk

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
struct RawProviderRate {
    #[serde(default)]
    in_per_1k: Option<RawValue>,
    #[serde(default)]
    out_per_1k: Option<RawValue>,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Deserialize)]
struct RawMultiplierRate {
    #[serde(default)]
    input_multiplier: Option<RawValue>,
    #[serde(default)]
    output_multiplier: Option<RawValue>,
    #[serde(default)]
    source: Option<String>,
}

impl Pricing {
    /// select and load the rate table; a provider table always wins over a multiplier table
    pub fn load(provider: Option<&Path>, multiplier: Option<&Path>) -> Result<Self, PricingError> {
        if let Some(path) = provider.filter(|p| table_exists(p, PricingMode::Provider)) {
            if multiplier.is_some() {
                debug!("provider table configured, ignoring multiplier table");
            }
            let contents = read_table(path)?;
            let table = parse_provider_table(&contents, path)?;
            info!(path = %path.display(), models = table.len(), "loaded provider rate table");
            return Ok(Pricing::Provider(table));
        }

        if let Some(path) = multiplier.filter(|p| table_exists(p, PricingMode::Multiplier)) {
            let contents = read_table(path)?;
            let table = parse_multiplier_table(&contents, path)?;
            info!(path = %path.display(), models = table.len(), "loaded multiplier rate table");
            return Ok(Pricing::Multiplier(table));
        }

        debug!("no rate table configured, cost columns disabled");
        Ok(Pricing::None)
    }

    pub fn mode(&self) -> PricingMode {
        match self {
            Pricing::None => PricingMode::None,
            Pricing::Provider(_) => PricingMode::Provider,
            Pricing::Multiplier(_) => PricingMode::Multiplier,
        }
    }

    /// exact-match lookup; `None` means the cost columns stay blank for this model
    pub fn resolve(&self, model: &str) -> Option<RateRecord<'_>> {
        match self {
            Pricing::None => None,
            Pricing::Provider(table) => table.get(model).map(RateRecord::Provider),
            Pricing::Multiplier(table) => table.get(model).map(RateRecord::Multiplier),
        }
    }
}

fn table_exists(path: &Path, mode: PricingMode) -> bool {
    if path.is_file() {
        true
    } else {
        warn!(
            path = %path.display(),
            mode = mode.as_str(),
            "configured rate table does not exist, skipping"
        );
        false
    }
}

fn read_table(path: &Path) -> Result<String, PricingError> {
    fs::read_to_string(path).map_err(|source| PricingError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_provider_table(
    contents: &str,
    path: &Path,
) -> Result<HashMap<String, ProviderRate>, PricingError> {
    let raw: HashMap<String, RawProviderRate> =
        serde_json::from_str(contents).map_err(|source| PricingError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let mut table = HashMap::with_capacity(raw.len());
    for (model, rate) in raw {
        let in_per_1k = numeric(rate.in_per_1k, path, &model, "in_per_1k")?;
        let out_per_1k = numeric(rate.out_per_1k, path, &model, "out_per_1k")?;

        // both prices or nothing
        match (in_per_1k, out_per_1k) {
            (Some(in_per_1k), Some(out_per_1k)) => {
                table.insert(
                    model,
                    ProviderRate {
                        in_per_1k,
                        out_per_1k,
                        source: rate.source.unwrap_or_default(),
                    },
                );
            }
            _ => debug!(model = %model, "incomplete provider rate, treating as absent"),
        }
    }
    Ok(table)
}

fn parse_multiplier_table(
    contents: &str,
    path: &Path,
) -> Result<HashMap<String, MultiplierRate>, PricingError> {
    let raw: HashMap<String, RawMultiplierRate> =
        serde_json::from_str(contents).map_err(|source| PricingError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    let mut table = HashMap::with_capacity(raw.len());
    for (model, rate) in raw {
        let input_multiplier = numeric(rate.input_multiplier, path, &model, "input_multiplier")?;
        let output_multiplier = numeric(rate.output_multiplier, path, &model, "output_multiplier")?;
        table.insert(
            model,
            MultiplierRate {
                input_multiplier: input_multiplier.unwrap_or(0.0),
                output_multiplier: output_multiplier.unwrap_or(0.0),
                source: rate.source.unwrap_or_default(),
            },
        );
    }
    Ok(table)
}

/// numbers and numeric strings pass through; null, "" and "N/A" mean missing
fn numeric(
    value: Option<RawValue>,
    path: &Path,
    model: &str,
    field: &'static str,
) -> Result<Option<f64>, PricingError> {
    let invalid = |value: String| PricingError::InvalidValue {
        path: path.to_path_buf(),
        model: model.to_string(),
        field,
        value,
    };

    match value {
        None => Ok(None),
        Some(RawValue::Number(n)) if n.is_finite() => Ok(Some(n)),
        Some(RawValue::Number(n)) => Err(invalid(n.to_string())),
        Some(RawValue::Text(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(invalid(text)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn no_tables_means_no_pricing() {
        let pricing = Pricing::load(None, None).unwrap();
        assert_eq!(pricing.mode(), PricingMode::None);
        assert!(pricing.resolve("openai/gpt-4.1-nano").is_none());
    }

    #[test]
    fn missing_files_are_skipped() {
        let pricing = Pricing::load(
            Some(Path::new("/nonexistent/provider.json")),
            Some(Path::new("/nonexistent/multipliers.json")),
        )
        .unwrap();
        assert_eq!(pricing.mode(), PricingMode::None);
    }

    #[test]
    fn provider_table_takes_precedence() {
        let provider = table_file(r#"{"a/model": {"in_per_1k": 0.1, "out_per_1k": 0.4, "source": "list"}}"#);
        let multiplier = table_file(r#"{"a/model": {"input_multiplier": 1, "output_multiplier": 4, "source": "sku"}}"#);

        let pricing = Pricing::load(Some(provider.path()), Some(multiplier.path())).unwrap();
        assert_eq!(pricing.mode(), PricingMode::Provider);
        match pricing.resolve("a/model") {
            Some(RateRecord::Provider(rate)) => {
                assert_eq!(rate.in_per_1k, 0.1);
                assert_eq!(rate.out_per_1k, 0.4);
                assert_eq!(rate.source, "list");
            }
            other => panic!("expected provider rate, got {other:?}"),
        }
    }

    #[test]
    fn missing_provider_file_falls_back_to_multiplier() {
        let multiplier = table_file(r#"{"a/model": {"input_multiplier": 1, "output_multiplier": 4, "source": "sku"}}"#);
        let pricing = Pricing::load(
            Some(Path::new("/nonexistent/provider.json")),
            Some(multiplier.path()),
        )
        .unwrap();
        assert_eq!(pricing.mode(), PricingMode::Multiplier);
    }

    #[test]
    fn incomplete_provider_record_is_absent() {
        let provider = table_file(
            r#"{
                "half/price": {"in_per_1k": 0.1, "source": "list"},
                "empty/price": {"in_per_1k": "", "out_per_1k": 0.2, "source": "list"},
                "null/price": {"in_per_1k": 0.1, "out_per_1k": null, "source": "list"},
                "full/price": {"in_per_1k": "0.1", "out_per_1k": 0.2, "source": "list"}
            }"#,
        );
        let pricing = Pricing::load(Some(provider.path()), None).unwrap();
        assert!(pricing.resolve("half/price").is_none());
        assert!(pricing.resolve("empty/price").is_none());
        assert!(pricing.resolve("null/price").is_none());
        assert!(pricing.resolve("full/price").is_some());
        assert!(pricing.resolve("unknown/model").is_none());
    }

    #[test]
    fn missing_multipliers_become_zero() {
        let multiplier = table_file(
            r#"{
                "null/input": {"input_multiplier": null, "output_multiplier": 0.5, "source": "sku"},
                "na/both": {"input_multiplier": "N/A", "output_multiplier": "N/A", "source": "sku"},
                "bare": {}
            }"#,
        );
        let pricing = Pricing::load(None, Some(multiplier.path())).unwrap();

        let Some(RateRecord::Multiplier(rate)) = pricing.resolve("null/input") else {
            panic!("expected multiplier rate");
        };
        assert_eq!(rate.input_multiplier, 0.0);
        assert_eq!(rate.output_multiplier, 0.5);

        let Some(RateRecord::Multiplier(rate)) = pricing.resolve("na/both") else {
            panic!("expected multiplier rate");
        };
        assert_eq!(rate.input_multiplier + rate.output_multiplier, 0.0);

        let Some(RateRecord::Multiplier(rate)) = pricing.resolve("bare") else {
            panic!("expected multiplier rate");
        };
        assert_eq!(rate.source, "");
    }

    #[test]
    fn malformed_json_is_a_startup_error() {
        let provider = table_file("{not json");
        let err = Pricing::load(Some(provider.path()), None).unwrap_err();
        assert!(matches!(err, PricingError::Decode { .. }));
    }

    #[test]
    fn non_numeric_text_is_rejected() {
        let multiplier = table_file(r#"{"a/model": {"input_multiplier": "cheap", "output_multiplier": 1}}"#);
        let err = Pricing::load(None, Some(multiplier.path())).unwrap_err();
        match err {
            PricingError::InvalidValue { model, field, .. } => {
                assert_eq!(model, "a/model");
                assert_eq!(field, "input_multiplier");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
