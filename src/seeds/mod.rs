pub mod settings_rules_seed;

pub use settings_rules_seed::*;
