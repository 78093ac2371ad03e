//! Per-user undo ledger.
//!
//! Every mutating operation pushes the prior [`CycleState`] before applying
//! its change, so an undo always restores the immediately preceding state.
//! Stacks are bounded; the oldest snapshot falls off first.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::state::CycleState;

pub const DEFAULT_UNDO_DEPTH: usize = 20;

/// Bounded per-user stacks of prior state snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UndoLedger {
    stacks: HashMap<String, Vec<CycleState>>,
    depth: usize,
}

impl UndoLedger {
    pub fn new(depth: usize) -> Self {
        Self {
            stacks: HashMap::new(),
            depth: depth.max(1),
        }
    }

    pub fn push(&mut self, username: &str, snapshot: CycleState) {
        let stack = self.stacks.entry(username.to_string()).or_default();
        stack.push(snapshot);
        if stack.len() > self.depth {
            stack.remove(0);
        }
    }

    pub fn pop(&mut self, username: &str) -> Option<CycleState> {
        self.stacks.get_mut(username)?.pop()
    }

    pub fn depth_for(&self, username: &str) -> usize {
        self.stacks.get(username).map_or(0, Vec::len)
    }

    pub fn clear(&mut self) {
        self.stacks.clear();
    }
}

impl Default for UndoLedger {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_DEPTH)
    }
}
