//! Monitoring hook for search runs.
//!
//! Observers see the tree between iterations, when no expansion or
//! backpropagation is in flight, so they always read a consistent snapshot.

use crate::search_result::StopReason;
use crate::tree::SearchTree;

/// Read-only collaborator notified as a search progresses
///
/// Both callbacks default to doing nothing.
pub trait SearchObserver<S>: Send + Sync {
    /// Called after iteration `iteration` (1-based) has been fully backpropagated
    fn on_iteration(&self, _iteration: u32, _tree: &SearchTree<S>) {}

    /// Called once when the loop stops, before the best path is extracted
    fn on_stop(&self, _reason: StopReason, _tree: &SearchTree<S>) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl<S> SearchObserver<S> for NoopObserver {}
