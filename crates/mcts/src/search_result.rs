use std::fmt;
use std::time::Duration;

/// Why the search loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// `max_iterations` rounds were run
    BudgetExhausted,

    /// The wall-clock budget ran out
    TimeExhausted,

    /// A path was solved or met the score threshold
    ThresholdReached,

    /// No expandable node is left (includes a failed first expansion)
    TreeExhausted,

    /// Stopped through a [`CancelHandle`](crate::CancelHandle)
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopReason::BudgetExhausted => "budget exhausted",
            StopReason::TimeExhausted => "time exhausted",
            StopReason::ThresholdReached => "threshold reached",
            StopReason::TreeExhausted => "tree exhausted",
            StopReason::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Counters collected over a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchStats {
    /// Nodes in the final tree, root included
    pub nodes_created: usize,

    /// Expander calls that produced at least one child
    pub expansions: u32,

    /// Nodes pruned because the expander kept failing
    pub expansion_failures: u32,

    /// Children pruned because the evaluator kept failing
    pub evaluation_failures: u32,

    /// Retries spent across all collaborator calls
    pub retries: u32,

    /// Calls cut off or never started because the time budget ran out
    pub interrupted: u32,

    /// Wall-clock time of the run
    pub elapsed: Duration,
}

/// Result of a tree search run
#[derive(Debug, Clone)]
pub struct SearchResult<S> {
    /// Segments of the best route, root excluded
    pub best_path: Vec<S>,

    /// Average value of the route's final node
    pub best_score: f32,

    /// Expand/evaluate rounds actually run
    pub iterations_used: u32,

    pub stop_reason: StopReason,

    pub stats: SearchStats,
}

impl<S> SearchResult<S> {
    /// Create a new search result
    pub fn new(
        best_path: Vec<S>,
        best_score: f32,
        iterations_used: u32,
        stop_reason: StopReason,
        stats: SearchStats,
    ) -> Self {
        Self {
            best_path,
            best_score,
            iterations_used,
            stop_reason,
            stats,
        }
    }

    /// True when not even the first expansion produced anything usable
    pub fn is_empty(&self) -> bool {
        self.best_path.is_empty()
    }

    /// Last step of the best route
    pub fn final_segment(&self) -> Option<&S> {
        self.best_path.last()
    }

    /// Whether the run ended because a good enough path was found
    pub fn reached_threshold(&self) -> bool {
        self.stop_reason == StopReason::ThresholdReached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_result() {
        let result: SearchResult<String> = SearchResult::new(
            Vec::new(),
            0.0,
            1,
            StopReason::TreeExhausted,
            SearchStats::default(),
        );

        assert!(result.is_empty());
        assert_eq!(result.final_segment(), None);
        assert!(!result.reached_threshold());
    }

    #[test]
    fn test_final_segment() {
        let result = SearchResult::new(
            vec!["plan", "act"],
            0.95,
            3,
            StopReason::ThresholdReached,
            SearchStats::default(),
        );

        assert_eq!(result.final_segment(), Some(&"act"));
        assert!(result.reached_threshold());
    }

    #[test]
    fn test_stop_reason_display() {
        assert_eq!(StopReason::BudgetExhausted.to_string(), "budget exhausted");
        assert_eq!(StopReason::Cancelled.to_string(), "cancelled");
    }
}
