pub mod run_config;

pub use run_config::{RunConfiguration, Selection};
