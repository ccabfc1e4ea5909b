use std::collections::VecDeque;

use crate::models::Turn;

/// Bounded window of recent turns. The oldest turn is dropped first.
#[derive(Debug, Clone)]
pub struct TurnHistory {
    capacity: usize,
    turns: VecDeque<Turn>,
}

impl TurnHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            turns: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, turn: Turn) {
        if self.capacity == 0 {
            return;
        }
        while self.turns.len() >= self.capacity {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Up to `limit` turns, newest first.
    pub fn most_recent_first(&self, limit: usize) -> Vec<Turn> {
        self.turns.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
