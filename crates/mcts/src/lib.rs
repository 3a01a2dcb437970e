//! Budgeted Monte Carlo Tree Search over reasoning paths.
//!
//! A task becomes the root of a search tree. Each iteration selects a
//! frontier node with UCT, asks an [`Expander`] for candidate next steps,
//! scores them with an [`Evaluator`] (optionally in parallel) and
//! backpropagates the scores to the root. When the iteration, depth or time
//! budget runs out, or a path is good enough, the highest-value route is
//! returned.
//!
//! # Example
//!
//! ```
//! use reasoning_mcts::{
//!     Evaluation, EvaluationError, Evaluator, ExpansionError, Expander, SearchConfig,
//!     StopReason, TreeSearch,
//! };
//!
//! struct Steps;
//!
//! impl Expander<String> for Steps {
//!     fn expand(
//!         &self,
//!         segment: &String,
//!         _depth: usize,
//!         max_candidates: usize,
//!     ) -> Result<Vec<String>, ExpansionError> {
//!         Ok((0..max_candidates).map(|i| format!("{segment}/{i}")).collect())
//!     }
//! }
//!
//! struct PreferOnes;
//!
//! impl Evaluator<String> for PreferOnes {
//!     fn evaluate(&self, segment: &String) -> Result<Evaluation, EvaluationError> {
//!         let ones = segment.matches('1').count() as f32;
//!         Ok(Evaluation::new(ones / 4.0))
//!     }
//! }
//!
//! let config = SearchConfig::default()
//!     .with_max_iterations(20)
//!     .with_branching_factor(2)
//!     .with_max_depth(4);
//!
//! let mut search = TreeSearch::new(Steps, PreferOnes);
//! let result = search.run("task".to_string(), &config).unwrap();
//!
//! assert!(!result.best_path.is_empty());
//! assert!(result.best_score >= 0.0 && result.best_score <= 1.0);
//! assert_ne!(result.stop_reason, StopReason::Cancelled);
//! ```

// Module declarations
mod backup;
mod config;
mod dispatch;
mod error;
mod evaluation;
mod expansion;
mod extraction;
mod observer;
mod search;
mod search_result;
mod selection;
mod tree;

// Public exports
pub use backup::backup;
pub use config::SearchConfig;
pub use error::{EvaluationError, ExpansionError, Result, SearchError};
pub use evaluation::{Evaluation, Evaluator};
pub use expansion::Expander;
pub use extraction::{BestPath, best_path, path_to_node};
pub use observer::{NoopObserver, SearchObserver};
pub use search::{CancelHandle, SearchPhase, TreeSearch, run_search};
pub use search_result::{SearchResult, SearchStats, StopReason};
pub use selection::{select, uct_value};
pub use tree::{NodeId, NodeStats, SearchNode, SearchTree};
