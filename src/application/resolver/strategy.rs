//! Resolution state machine bookkeeping.

use serde::Serialize;

use crate::domain::{Resolution, Strategy};

/// Result of running one strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", content = "detail", rename_all = "snake_case")]
pub enum StepResult {
    Success,
    Miss,
    Failed(String),
}

/// Where a strategy stands within one resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum StrategyState {
    NotTried,
    /// Not applicable to this input or not supported remotely.
    Skipped(String),
    Tried(StepResult),
}

/// Per-strategy record of one resolution.
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionTrace {
    pub input: String,
    pub normalized: String,
    /// Answered from the identifier cache without running any strategy.
    pub from_cache: bool,
    pub steps: Vec<(Strategy, StrategyState)>,
    #[serde(skip)]
    pub outcome: Resolution,
}

impl ResolutionTrace {
    pub(crate) fn new(input: &str, normalized: &str, order: &[Strategy]) -> Self {
        Self {
            input: input.to_string(),
            normalized: normalized.to_string(),
            from_cache: false,
            steps: order.iter().map(|s| (*s, StrategyState::NotTried)).collect(),
            outcome: Resolution::NotFound,
        }
    }

    pub(crate) fn set(&mut self, strategy: Strategy, state: StrategyState) {
        if let Some(step) = self.steps.iter_mut().find(|(s, _)| *s == strategy) {
            step.1 = state;
        }
    }

    /// State of `strategy`, if it is part of the configured order.
    #[must_use]
    pub fn state_of(&self, strategy: Strategy) -> Option<&StrategyState> {
        self.steps
            .iter()
            .find(|(s, _)| *s == strategy)
            .map(|(_, state)| state)
    }

    /// Strategies that were attempted, in order.
    #[must_use]
    pub fn attempted(&self) -> Vec<Strategy> {
        self.steps
            .iter()
            .filter(|(_, state)| matches!(state, StrategyState::Tried(_)))
            .map(|(s, _)| *s)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trace_tracks_states_in_order() {
        let mut trace = ResolutionTrace::new("x", "x", &Strategy::DEFAULT_ORDER);
        trace.set(Strategy::ParseIdentifier, StrategyState::Tried(StepResult::Miss));
        trace.set(
            Strategy::ServerSearch,
            StrategyState::Skipped("unsupported".into()),
        );
        trace.set(Strategy::ExactName, StrategyState::Tried(StepResult::Success));

        assert_eq!(
            trace.attempted(),
            vec![Strategy::ParseIdentifier, Strategy::ExactName]
        );
        assert_eq!(
            trace.state_of(Strategy::TableScan),
            Some(&StrategyState::NotTried)
        );
    }
}
