use std::time::Duration;

use crate::error::{Result, SearchError};

/// Configuration for a tree search run
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Hard cap on expand/evaluate rounds
    pub max_iterations: u32,

    /// No node may be created deeper than this
    pub max_depth: usize,

    /// Maximum number of candidates requested per expansion
    pub branching_factor: usize,

    /// UCT exploration constant (sqrt(2) is the textbook value)
    pub exploration_constant: f32,

    /// Stop early once a path scores at or above this (1.0 disables score-based stopping)
    pub score_threshold: f32,

    /// Wall-clock cap for the whole run
    pub time_budget: Option<Duration>,

    /// Maximum number of evaluator calls in flight at once
    pub evaluation_concurrency: usize,

    /// Timeout attached to each individual expander/evaluator call
    pub call_timeout: Option<Duration>,

    /// Retries after the first failed attempt of a collaborator call
    pub max_retries: u32,
}

impl SearchConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration cap
    pub fn with_max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = n;
        self
    }

    /// Set the maximum tree depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set how many candidates each expansion may produce
    pub fn with_branching_factor(mut self, n: usize) -> Self {
        self.branching_factor = n;
        self
    }

    /// Set UCT exploration constant
    pub fn with_exploration_constant(mut self, c: f32) -> Self {
        self.exploration_constant = c;
        self
    }

    /// Set the early-stop score threshold
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }

    /// Set a wall-clock budget for the run
    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }

    /// Set the number of concurrent evaluator calls (>=1)
    pub fn with_evaluation_concurrency(mut self, n: usize) -> Self {
        self.evaluation_concurrency = n.max(1);
        self
    }

    /// Set the per-call timeout for collaborator calls
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// Set the retry count for failed collaborator calls
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Whether a score is high enough to end the run early
    pub fn meets_threshold(&self, score: f32) -> bool {
        self.score_threshold < 1.0 && score >= self.score_threshold
    }

    /// Check every option against its allowed range
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(invalid("max_iterations must be > 0"));
        }
        if self.max_depth == 0 {
            return Err(invalid("max_depth must be > 0"));
        }
        if self.branching_factor == 0 {
            return Err(invalid("branching_factor must be >= 1"));
        }
        if !self.exploration_constant.is_finite() || self.exploration_constant < 0.0 {
            return Err(invalid(format!(
                "exploration_constant must be a finite value >= 0, got {}",
                self.exploration_constant
            )));
        }
        if !(0.0..=1.0).contains(&self.score_threshold) {
            return Err(invalid(format!(
                "score_threshold must be in [0, 1], got {}",
                self.score_threshold
            )));
        }
        if self.evaluation_concurrency == 0 {
            return Err(invalid("evaluation_concurrency must be >= 1"));
        }
        Ok(())
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            max_depth: 8,
            branching_factor: 3,
            exploration_constant: 1.41,
            score_threshold: 1.0,
            time_budget: None,
            evaluation_concurrency: 1,
            call_timeout: None,
            max_retries: 2,
        }
    }
}

fn invalid(msg: impl Into<String>) -> SearchError {
    SearchError::InvalidConfig(msg.into())
}
