use crate::data::Timeframe;
use crate::strategy::rules::{
    ConfirmationRule, ExitRule, PullbackRule, SessionGate, SlopeRule, StopRule, TrendFilter,
};
use crate::strategy::variant::{BearishGuard, ConfigError, Extension, Variant};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_VARIANT: &str = "v1";

//outcome of a registry lookup
//fell_back is set whenever the requested key was absent or unknown
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub variant: &'a Variant,
    pub fell_back: bool,
}

//fixed catalog of named variants, insertion ordered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRegistry {
    default_key: String,
    variants: IndexMap<String, Variant>,
}

//normalizes a user supplied key: trim, lowercase, bare numbers become "v<n>"
pub fn normalize_key(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    match key.parse::<u32>() {
        Ok(n) => format!("v{}", n),
        Err(_) => key,
    }
}

impl VariantRegistry {
    //builds a registry from variants, validating each one
    pub fn new(default_key: &str, variants: Vec<Variant>) -> Result<Self, ConfigError> {
        if variants.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }

        let mut map = IndexMap::with_capacity(variants.len());
        for variant in variants {
            variant.validate()?;
            map.insert(normalize_key(&variant.name), variant);
        }

        let registry = VariantRegistry {
            default_key: normalize_key(default_key),
            variants: map,
        };
        registry.check()?;
        Ok(registry)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.variants.is_empty() {
            return Err(ConfigError::EmptyRegistry);
        }
        for (key, variant) in &self.variants {
            variant.validate()?;
            if normalize_key(&variant.name) != *key {
                return Err(ConfigError::KeyMismatch {
                    key: key.clone(),
                    name: variant.name.clone(),
                });
            }
        }
        if !self.variants.contains_key(&self.default_key) {
            return Err(ConfigError::MissingDefault(self.default_key.clone()));
        }
        Ok(())
    }

    //the ten-variant ema pullback playbook
    pub fn builtin() -> Self {
        let variants = builtin_variants();
        let map = variants
            .into_iter()
            .map(|v| (v.name.clone(), v))
            .collect();
        VariantRegistry {
            default_key: DEFAULT_VARIANT.to_string(),
            variants: map,
        }
    }

    //exact lookup after normalization, no fallback
    pub fn get(&self, key: &str) -> Option<&Variant> {
        self.variants.get(&normalize_key(key))
    }

    pub fn default_variant(&self) -> &Variant {
        //check() guarantees the default key is present
        &self.variants[&self.default_key]
    }

    //lookup with fallback to the default variant; the fallback is logged and reported
    pub fn resolve(&self, key: Option<&str>) -> Resolution<'_> {
        let found = key.and_then(|k| self.get(k));
        match found {
            Some(variant) => Resolution {
                variant,
                fell_back: false,
            },
            None => {
                tracing::warn!(
                    requested = key.unwrap_or("<none>"),
                    fallback = %self.default_key,
                    "unrecognized variant, falling back to default"
                );
                Resolution {
                    variant: self.default_variant(),
                    fell_back: true,
                }
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.variants.keys().map(|k| k.as_str())
    }

    pub fn variants(&self) -> impl Iterator<Item = &Variant> {
        self.variants.values()
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    //load a registry from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .context(format!("Failed to read variant registry {:?}", path))?;
        let mut registry: VariantRegistry = serde_json::from_str(&contents)
            .context(format!("Failed to parse variant registry {:?}", path))?;

        //keys written by hand may not be normalized
        registry.default_key = normalize_key(&registry.default_key);
        registry.variants = registry
            .variants
            .into_iter()
            .map(|(k, v)| (normalize_key(&k), v))
            .collect();
        registry.check()?;
        Ok(registry)
    }

    //save the registry to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

impl Default for VariantRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[allow(clippy::too_many_arguments)]
fn variant(
    name: &str,
    description: &str,
    pullback: PullbackRule,
    confirmation: ConfirmationRule,
    trend_filter: TrendFilter,
    slope: SlopeRule,
    stop: StopRule,
    exit: ExitRule,
    session: SessionGate,
    tp_multiple: f64,
) -> Variant {
    Variant {
        name: name.to_string(),
        description: description.to_string(),
        pullback,
        confirmation,
        trend_filter,
        slope,
        session,
        stop,
        exit,
        tp_multiple,
        extension: Extension::None,
        bearish_guard: BearishGuard::default(),
    }
}

fn builtin_variants() -> Vec<Variant> {
    use ConfirmationRule::{BullishClose, ConsecutiveBullish};
    use PullbackRule::{Moderate, Shallow, TouchSlow};

    let two_green = ConsecutiveBullish { count: 2 };
    let m15 = TrendFilter::HigherTimeframe(Timeframe::M15);
    let h1 = TrendFilter::HigherTimeframe(Timeframe::H1);
    let swing = StopRule::SwingLow { lookback: 3 };
    let day = SessionGate::day_session();

    let mut v6 = variant(
        "v6",
        "compression breakout",
        Shallow,
        BullishClose,
        m15,
        SlopeRule::Fast,
        StopRule::BelowSlow,
        ExitRule::CloseBelowSlow,
        day,
        2.0,
    );
    v6.extension = Extension::Compression {
        threshold: 0.002,
        length: 3,
    };

    let mut v10 = variant(
        "v10",
        "late entry continuation",
        Shallow,
        BullishClose,
        m15,
        SlopeRule::Fast,
        StopRule::BelowSlow,
        ExitRule::CloseBelowSlow,
        day,
        2.0,
    );
    v10.extension = Extension::Continuation {
        length: 5,
        near_fast_pad: 0.0015,
    };

    vec![
        variant(
            "v1",
            "baseline loose scalper",
            Shallow,
            BullishClose,
            TrendFilter::None,
            SlopeRule::None,
            StopRule::BelowSlow,
            ExitRule::TargetOrStop,
            SessionGate::Always,
            2.0,
        ),
        variant(
            "v2",
            "momentum guard",
            Shallow,
            two_green,
            m15,
            SlopeRule::Fast,
            StopRule::BelowSlow,
            ExitRule::CloseBelowSlow,
            day,
            2.0,
        ),
        variant(
            "v3",
            "macro-aligned sniper",
            Moderate,
            two_green,
            h1,
            SlopeRule::FastAndSlow,
            swing,
            ExitRule::CloseBelowSlow,
            day,
            2.0,
        ),
        variant(
            "v4",
            "reversion bounce farm",
            TouchSlow,
            BullishClose,
            m15,
            SlopeRule::Fast,
            swing,
            ExitRule::TargetOrStop,
            SessionGate::Always,
            2.0,
        ),
        variant(
            "v5",
            "panic eject",
            Shallow,
            BullishClose,
            m15,
            SlopeRule::Fast,
            StopRule::BelowSlow,
            ExitRule::FastBelowSlow,
            day,
            2.0,
        ),
        v6,
        variant(
            "v7",
            "scalp factory stress test",
            Shallow,
            BullishClose,
            TrendFilter::None,
            SlopeRule::None,
            StopRule::BelowSlow,
            ExitRule::TargetOrStop,
            SessionGate::Always,
            2.0,
        ),
        variant(
            "v8",
            "tight stop, 3R target",
            Moderate,
            two_green,
            m15,
            SlopeRule::Fast,
            swing,
            ExitRule::CloseBelowSlow,
            day,
            3.0,
        ),
        variant(
            "v9",
            "capital efficiency",
            Shallow,
            two_green,
            m15,
            SlopeRule::Fast,
            StopRule::BelowSlow,
            ExitRule::CloseBelowSlow,
            day,
            2.0,
        ),
        v10,
    ]
}
