//rule families, the variant catalog and the per-variant signal scan

pub mod evaluator;
pub mod registry;
pub mod rules;
pub mod variant;

pub use evaluator::{evaluate, evaluate_resolved, resolve_references};
pub use registry::{normalize_key, Resolution, VariantRegistry, DEFAULT_VARIANT};
pub use rules::{
    ConfirmationRule, ExitRule, PullbackRule, References, SessionGate, SlopeRule, StopRule,
    TrendFilter,
};
pub use variant::{BearishGuard, ConfigError, Extension, Variant};
