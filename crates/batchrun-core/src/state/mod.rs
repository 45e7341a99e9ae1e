use std::{
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::SystemTime,
};

use batchrun_model::{ResourceToken, TaskPhase};
use tracing::{trace, warn};

/// Live view of one task in the current run.
#[derive(Debug, Clone, PartialEq)]
pub struct BoardEntry {
    pub index: usize,
    pub identifier: String,
    pub phase: TaskPhase,
    /// Tokens held while the phase is `Preparing` or `Running`.
    pub tokens: Vec<ResourceToken>,
    pub updated_at: SystemTime,
}

/// In-memory phase tracking for every task of a run.
///
/// Cheap to clone; all clones share the same state. Readers may poll it from another task
/// while [`crate::Launcher::run`] is in progress.
#[derive(Clone, Default)]
pub struct TaskBoard {
    inner: Arc<RwLock<Vec<BoardEntry>>>,
}

impl TaskBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous run and register `identifiers` as pending, in submission order.
    pub fn reset<I>(&self, identifiers: I)
    where
        I: IntoIterator<Item = String>,
    {
        let now = SystemTime::now();
        let mut inner = self.write();
        *inner = identifiers
            .into_iter()
            .enumerate()
            .map(|(index, identifier)| BoardEntry {
                index,
                identifier,
                phase: TaskPhase::Pending,
                tokens: Vec::new(),
                updated_at: now,
            })
            .collect();
    }

    /// Move a task to `next`. Illegal transitions are ignored and reported as `false`.
    pub fn advance(&self, index: usize, next: TaskPhase) -> bool {
        let mut inner = self.write();
        let Some(entry) = inner.get_mut(index) else {
            return false;
        };
        if !entry.phase.can_advance_to(next) {
            warn!(
                target: "batchrun.board",
                index,
                from = %entry.phase,
                to = %next,
                "illegal phase transition ignored"
            );
            return false;
        }
        trace!(target: "batchrun.board", index, from = %entry.phase, to = %next, "phase");
        entry.phase = next;
        if !next.holds_resources() {
            entry.tokens.clear();
        }
        entry.updated_at = SystemTime::now();
        true
    }

    /// Record the tokens granted to a task.
    pub fn hold(&self, index: usize, tokens: &[ResourceToken]) {
        if let Some(entry) = self.write().get_mut(index) {
            entry.tokens = tokens.to_vec();
            entry.updated_at = SystemTime::now();
        }
    }

    pub fn get(&self, index: usize) -> Option<BoardEntry> {
        self.read().get(index).cloned()
    }

    pub fn snapshot(&self) -> Vec<BoardEntry> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Number of tasks whose phase satisfies `pred`.
    pub fn count(&self, pred: impl Fn(&TaskPhase) -> bool) -> usize {
        self.read().iter().filter(|e| pred(&e.phase)).count()
    }

    /// Total tokens currently held across all tasks.
    pub fn tokens_held(&self) -> usize {
        self.read().iter().map(|e| e.tokens.len()).sum()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<BoardEntry>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<BoardEntry>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
