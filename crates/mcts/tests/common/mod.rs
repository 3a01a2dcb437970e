//! Deterministic collaborator stubs shared by the integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use reasoning_mcts::{
    Evaluation, EvaluationError, Evaluator, ExpansionError, Expander, NodeId, SearchObserver,
    SearchTree,
};

/// Always proposes `fanout` children named `<parent>/<i>`
pub struct FixedFanout {
    pub fanout: usize,
}

impl Expander<String> for FixedFanout {
    fn expand(
        &self,
        segment: &String,
        _depth: usize,
        _max_candidates: usize,
    ) -> Result<Vec<String>, ExpansionError> {
        Ok((0..self.fanout).map(|i| format!("{segment}/{i}")).collect())
    }
}

/// Like [`FixedFanout`] but always fails on the listed segments
pub struct FailingOn {
    pub fanout: usize,
    pub fail_on: HashSet<String>,
}

impl FailingOn {
    pub fn new(fanout: usize, fail_on: &[&str]) -> Self {
        Self {
            fanout,
            fail_on: fail_on.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Expander<String> for FailingOn {
    fn expand(
        &self,
        segment: &String,
        depth: usize,
        max_candidates: usize,
    ) -> Result<Vec<String>, ExpansionError> {
        if self.fail_on.contains(segment) {
            return Err(ExpansionError::Unavailable(format!("no model for {segment}")));
        }
        FixedFanout {
            fanout: self.fanout,
        }
        .expand(segment, depth, max_candidates)
    }
}

/// Fixed score per segment with a default for everything else
pub struct ScoreTable {
    pub default: f32,
    pub scores: HashMap<String, Evaluation>,
}

impl ScoreTable {
    pub fn flat(score: f32) -> Self {
        Self {
            default: score,
            scores: HashMap::new(),
        }
    }

    pub fn with(mut self, segment: &str, evaluation: Evaluation) -> Self {
        self.scores.insert(segment.to_string(), evaluation);
        self
    }
}

impl Evaluator<String> for ScoreTable {
    fn evaluate(&self, segment: &String) -> Result<Evaluation, EvaluationError> {
        Ok(self
            .scores
            .get(segment)
            .copied()
            .unwrap_or(Evaluation::new(self.default)))
    }
}

/// Fails on the listed segments, otherwise scores `score`
pub struct ErrorsOn {
    pub score: f32,
    pub fail_on: HashSet<String>,
}

impl ErrorsOn {
    pub fn new(score: f32, fail_on: &[&str]) -> Self {
        Self {
            score,
            fail_on: fail_on.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Evaluator<String> for ErrorsOn {
    fn evaluate(&self, segment: &String) -> Result<Evaluation, EvaluationError> {
        if self.fail_on.contains(segment) {
            return Err(EvaluationError::Unavailable("scorer offline".into()));
        }
        Ok(Evaluation::new(self.score))
    }
}

/// Sleeps before answering, counting the calls it gets
pub struct Sleepy {
    pub delay: Duration,
    pub score: f32,
    pub calls: AtomicU32,
}

impl Sleepy {
    pub fn new(delay: Duration, score: f32) -> Self {
        Self {
            delay,
            score,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Evaluator<String> for Sleepy {
    fn evaluate(&self, _segment: &String) -> Result<Evaluation, EvaluationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(Evaluation::new(self.score))
    }
}

/// FNV-1a over the segment, salted
pub fn fnv(segment: &str, salt: u64) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325u64 ^ salt;
    for byte in segment.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

/// Pseudo-random but reproducible score derived from the segment text
pub struct HashScore {
    pub salt: u64,
}

impl Evaluator<String> for HashScore {
    fn evaluate(&self, segment: &String) -> Result<Evaluation, EvaluationError> {
        let hash = fnv(segment, self.salt);
        match hash % 11 {
            0 => Err(EvaluationError::Malformed("garbled".into())),
            _ => Ok(Evaluation::new((hash % 1000) as f32 / 999.0)),
        }
    }
}

/// Reproducible fanout between 0 and `max_fanout`, failing on some segments
pub struct HashFanout {
    pub salt: u64,
    pub max_fanout: usize,
}

impl Expander<String> for HashFanout {
    fn expand(
        &self,
        segment: &String,
        _depth: usize,
        max_candidates: usize,
    ) -> Result<Vec<String>, ExpansionError> {
        let hash = fnv(segment, self.salt.rotate_left(17));
        if hash % 13 == 0 {
            return Err(ExpansionError::Malformed("unparseable".into()));
        }
        let fanout = (hash % (self.max_fanout as u64 + 1)) as usize;
        // Deliberately ignores `max_candidates` at times to exercise truncation
        let fanout = if hash % 5 == 0 {
            fanout + 1
        } else {
            fanout.min(max_candidates)
        };
        Ok((0..fanout).map(|i| format!("{segment}/{i}")).collect())
    }
}

/// Everything that identifies a node, for whole-tree comparisons
pub type NodeSnapshot = (String, Option<NodeId>, Vec<NodeId>, usize, u32, f32, bool, bool);

pub fn snapshot(tree: &SearchTree<String>) -> Vec<NodeSnapshot> {
    tree.iter()
        .map(|n| {
            (
                n.segment().clone(),
                n.parent(),
                n.children().to_vec(),
                n.depth(),
                n.visit_count(),
                n.value_sum(),
                n.is_terminal(),
                n.is_pruned(),
            )
        })
        .collect()
}

/// Records every node's visit count after each iteration
#[derive(Default)]
pub struct VisitHistory {
    pub history: Mutex<Vec<Vec<u32>>>,
}

impl SearchObserver<String> for VisitHistory {
    fn on_iteration(&self, _iteration: u32, tree: &SearchTree<String>) {
        let visits = tree.iter().map(|n| n.visit_count()).collect();
        self.history.lock().unwrap().push(visits);
    }
}
