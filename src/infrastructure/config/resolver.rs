//! Identifier resolution settings.

use serde::Deserialize;

use crate::domain::Strategy;

/// Strategy order for identifier resolution.
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    #[serde(default = "default_strategies")]
    pub strategies: Vec<Strategy>,
}

fn default_strategies() -> Vec<Strategy> {
    Strategy::DEFAULT_ORDER.to_vec()
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strategies: default_strategies(),
        }
    }
}
