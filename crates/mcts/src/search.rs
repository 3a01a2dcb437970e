use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use crate::backup::backup;
use crate::config::SearchConfig;
use crate::dispatch::CallPolicy;
use crate::error::{EvaluationError, Result};
use crate::evaluation::{Evaluator, ScoredChild, evaluate_batch};
use crate::expansion::{ExpansionOutcome, Expander, expand_node};
use crate::extraction::{BestPath, best_path, path_to_node};
use crate::observer::SearchObserver;
use crate::search_result::{SearchResult, SearchStats, StopReason};
use crate::selection::select;
use crate::tree::{NodeId, SearchTree};

/// Where the controller currently is in its loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchPhase {
    Idle,
    Selecting,
    Expanding,
    Evaluating,
    Backpropagating,
    /// A stop condition was met (or the run failed)
    Terminated,
    /// Best path extracted
    Completed,
}

/// Cooperative cancellation for a running search
///
/// Checked at the top of every iteration; the batch in flight always
/// finishes backpropagating first. A cancelled handle stays cancelled until
/// [`reset`](CancelHandle::reset).
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Default)]
struct RunCounters {
    iterations: u32,
    stats: SearchStats,
    /// First node that met the score threshold or was solved
    reached: Option<NodeId>,
}

/// Budgeted Monte Carlo Tree Search over reasoning paths
///
/// Owns its collaborators and the tree of the last run, which stays
/// readable after the run ends, including after a failed run.
pub struct TreeSearch<S, X, V> {
    expander: Arc<X>,
    evaluator: Arc<V>,
    observer: Option<Arc<dyn SearchObserver<S>>>,
    tree: Option<SearchTree<S>>,
    phase: SearchPhase,
    cancel: CancelHandle,
}

impl<S, X, V> TreeSearch<S, X, V>
where
    S: Clone + Send + 'static,
    X: Expander<S>,
    V: Evaluator<S>,
{
    /// Create a new search controller
    pub fn new(expander: X, evaluator: V) -> Self {
        Self::from_shared(Arc::new(expander), Arc::new(evaluator))
    }

    /// Create a controller around collaborators shared with other searches
    pub fn from_shared(expander: Arc<X>, evaluator: Arc<V>) -> Self {
        Self {
            expander,
            evaluator,
            observer: None,
            tree: None,
            phase: SearchPhase::Idle,
            cancel: CancelHandle::default(),
        }
    }

    /// Attach a monitoring observer
    pub fn with_observer<O: SearchObserver<S> + 'static>(mut self, observer: Arc<O>) -> Self {
        let observer: Arc<dyn SearchObserver<S>> = observer;
        self.observer = Some(observer);
        self
    }

    /// Handle that stops the search from another thread
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Tree of the most recent run
    pub fn tree(&self) -> Option<&SearchTree<S>> {
        self.tree.as_ref()
    }

    pub fn phase(&self) -> SearchPhase {
        self.phase
    }

    /// Run the search for `task`, which becomes the root segment
    ///
    /// Collaborator failures prune nodes and never fail the run; only an
    /// invalid configuration or a broken tree invariant does.
    pub fn run(&mut self, task: S, config: &SearchConfig) -> Result<SearchResult<S>> {
        config.validate()?;

        let span = info_span!(
            "tree_search",
            max_iterations = config.max_iterations,
            max_depth = config.max_depth,
            branching_factor = config.branching_factor
        );
        let _enter = span.enter();

        let started = Instant::now();
        let deadline = config.time_budget.map(|budget| started + budget);
        let mut tree = SearchTree::new(task);
        let mut counters = RunCounters::default();
        self.phase = SearchPhase::Idle;

        let stopped = self.drive(&mut tree, config, deadline, &mut counters);
        self.phase = SearchPhase::Terminated;

        let extracted = stopped
            .and_then(|reason| tree.validate().map(|()| reason))
            .and_then(|reason| {
                info!(
                    %reason,
                    iterations = counters.iterations,
                    nodes = tree.len(),
                    "search stopped"
                );
                if let Some(observer) = &self.observer {
                    observer.on_stop(reason, &tree);
                }
                extract(&tree, reason, counters.reached).map(|best| (reason, best))
            });
        let (reason, best) = match extracted {
            Ok(extracted) => extracted,
            Err(err) => {
                warn!(error = %err, "search aborted");
                self.tree = Some(tree);
                return Err(err);
            }
        };

        let mut stats = counters.stats;
        stats.nodes_created = tree.len();
        stats.elapsed = started.elapsed();

        let result = SearchResult::new(
            best.segments(&tree).into_iter().cloned().collect(),
            best.score,
            counters.iterations,
            reason,
            stats,
        );

        self.tree = Some(tree);
        self.phase = SearchPhase::Completed;
        Ok(result)
    }

    /// Select, expand, evaluate, backpropagate until a stop condition holds
    fn drive(
        &mut self,
        tree: &mut SearchTree<S>,
        config: &SearchConfig,
        deadline: Option<Instant>,
        counters: &mut RunCounters,
    ) -> Result<StopReason> {
        loop {
            if !tree.root().is_open() {
                return Ok(StopReason::TreeExhausted);
            }
            if counters.iterations >= config.max_iterations {
                return Ok(StopReason::BudgetExhausted);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Ok(StopReason::TimeExhausted);
            }
            if self.cancel.is_cancelled() {
                return Ok(StopReason::Cancelled);
            }

            self.phase = SearchPhase::Selecting;
            let Some(node_id) = select(tree, config.exploration_constant) else {
                return Ok(StopReason::TreeExhausted);
            };

            let depth = tree.get(node_id).depth();
            if depth >= config.max_depth {
                debug!(node = %node_id, depth, "depth cap reached, marking terminal");
                tree.mark_terminal(node_id);
                continue;
            }

            counters.iterations += 1;
            let iteration = counters.iterations;
            debug!(iteration, node = %node_id, depth, "iteration");

            let reached = self.iterate(tree, node_id, config, deadline, counters)?;

            if let Some(observer) = &self.observer {
                observer.on_iteration(iteration, tree);
            }
            if reached.is_some() {
                counters.reached = reached;
                return Ok(StopReason::ThresholdReached);
            }
        }
    }

    /// One full round on `node_id`
    ///
    /// Returns the lowest-id child that was solved or met the threshold.
    fn iterate(
        &mut self,
        tree: &mut SearchTree<S>,
        node_id: NodeId,
        config: &SearchConfig,
        deadline: Option<Instant>,
        counters: &mut RunCounters,
    ) -> Result<Option<NodeId>> {
        self.phase = SearchPhase::Expanding;
        let policy = CallPolicy::from_config(config, deadline);
        let report = expand_node(tree, node_id, &self.expander, config.branching_factor, policy)?;
        counters.stats.retries += report.retries;

        let children = match report.outcome {
            ExpansionOutcome::Expanded(children) => children,
            ExpansionOutcome::Exhausted => return Ok(None),
            ExpansionOutcome::Interrupted => {
                counters.stats.interrupted += 1;
                return Ok(None);
            }
            ExpansionOutcome::Failed(_) => {
                // The dead end still counts once in every ancestor
                counters.stats.expansion_failures += 1;
                self.phase = SearchPhase::Backpropagating;
                backup(tree, node_id, 0.0)?;
                return Ok(None);
            }
        };
        counters.stats.expansions += 1;

        self.phase = SearchPhase::Evaluating;
        let policy = CallPolicy::from_config(config, deadline);
        let scored = evaluate_batch(
            tree,
            &children,
            &self.evaluator,
            config.evaluation_concurrency,
            policy,
        );

        self.phase = SearchPhase::Backpropagating;
        let mut reached = None;
        for ScoredChild {
            node_id: child_id,
            result,
            retries,
        } in scored
        {
            counters.stats.retries += retries;
            match result {
                Ok(evaluation) => {
                    backup(tree, child_id, evaluation.score)?;
                    if evaluation.solved || config.meets_threshold(evaluation.score) {
                        info!(
                            node = %child_id,
                            score = evaluation.score,
                            solved = evaluation.solved,
                            "path reached threshold"
                        );
                        tree.mark_terminal(child_id);
                        reached = reached.or(Some(child_id));
                    }
                }
                // Cut off by the time budget: left unvisited for the run to stop on
                Err(EvaluationError::Interrupted) => counters.stats.interrupted += 1,
                Err(_) => {
                    counters.stats.evaluation_failures += 1;
                    tree.mark_pruned(child_id);
                    backup(tree, child_id, 0.0)?;
                }
            }
        }

        Ok(reached)
    }
}

/// Route reported for a run that stopped with `reason`
///
/// An early stop reports the route to the node that triggered it; every
/// other stop walks the tree greedily.
fn extract<S>(
    tree: &SearchTree<S>,
    reason: StopReason,
    reached: Option<NodeId>,
) -> Result<BestPath> {
    match (reason, reached) {
        (StopReason::ThresholdReached, Some(node_id)) => path_to_node(tree, node_id),
        _ => Ok(best_path(tree)),
    }
}

/// Run a one-off search with fresh collaborators
pub fn run_search<S, X, V>(
    task: S,
    config: &SearchConfig,
    expander: X,
    evaluator: V,
) -> Result<SearchResult<S>>
where
    S: Clone + Send + 'static,
    X: Expander<S>,
    V: Evaluator<S>,
{
    TreeSearch::new(expander, evaluator).run(task, config)
}
