use crate::engine::{BacktestConfig, RiskParams};
use crate::strategy::{Resolution, VariantRegistry};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

//a variant picked for a run, with the key that asked for it
#[derive(Debug, Clone, Copy)]
pub struct Selection<'a> {
    pub requested: Option<&'a str>,
    pub resolution: Resolution<'a>,
}

//complete run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfiguration {
    //data
    pub data_path: PathBuf,

    //variant keys to evaluate; empty means every registered variant
    pub variants: Vec<String>,
    //optional registry file replacing the built-in catalog
    pub variants_file: Option<PathBuf>,

    //simulation
    pub risk: RiskParams,
    pub max_open_trades: usize,

    //optional output paths
    pub output_csv: Option<PathBuf>,
    pub output_json: Option<PathBuf>,
    pub trades_dir: Option<PathBuf>,
}

impl Default for RunConfiguration {
    fn default() -> Self {
        RunConfiguration {
            data_path: PathBuf::from("data.csv"),
            variants: Vec::new(),
            variants_file: None,
            risk: RiskParams::default(),
            max_open_trades: 1,
            output_csv: None,
            output_json: None,
            trades_dir: None,
        }
    }
}

impl RunConfiguration {
    //load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read configuration {:?}", path))?;
        let config: RunConfiguration = serde_json::from_str(&contents)
            .context(format!("Failed to parse configuration {:?}", path))?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn backtest_config(&self) -> BacktestConfig {
        BacktestConfig {
            max_open_trades: self.max_open_trades,
            risk: self.risk,
        }
    }

    //registry from variants_file, or the built-in catalog
    pub fn registry(&self) -> Result<VariantRegistry> {
        match &self.variants_file {
            Some(path) => VariantRegistry::from_json_file(path),
            None => Ok(VariantRegistry::builtin()),
        }
    }

    //resolves the configured keys against the registry
    //unknown keys fall back to the default variant; a variant is selected at most once
    pub fn select<'a>(&'a self, registry: &'a VariantRegistry) -> Vec<Selection<'a>> {
        let selections: Vec<Selection<'a>> = if self.variants.is_empty() {
            registry
                .variants()
                .map(|variant| Selection {
                    requested: None,
                    resolution: Resolution {
                        variant,
                        fell_back: false,
                    },
                })
                .collect()
        } else {
            self.variants
                .iter()
                .map(|key| Selection {
                    requested: Some(key.as_str()),
                    resolution: registry.resolve(Some(key.as_str())),
                })
                .collect()
        };

        let mut seen: Vec<&str> = Vec::with_capacity(selections.len());
        selections
            .into_iter()
            .filter(|s| {
                let name = s.resolution.variant.name.as_str();
                if seen.contains(&name) {
                    false
                } else {
                    seen.push(name);
                    true
                }
            })
            .collect()
    }
}
