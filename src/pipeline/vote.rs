//! Vote Smoother - majority vote over the last K labels
//!
//! A classifier running on raw glove frames flickers between neighbouring
//! gestures while the hand is moving. Voting over a short window of recent
//! predictions holds the dominant label steady.
//!
//! Tie-break: when several labels share the highest count, the one inserted
//! earliest in the window wins. The tally walks the window in insertion order
//! and only replaces the leader on a strictly greater count, so the result is
//! a deterministic function of the window contents.

use std::collections::VecDeque;

use crate::types::Label;

/// Fixed-capacity FIFO window with majority-vote output.
#[derive(Debug, Clone)]
pub struct VoteSmoother {
    window: VecDeque<Label>,
    capacity: usize,
}

impl VoteSmoother {
    /// Create an empty smoother holding at most `capacity` labels.
    ///
    /// A capacity of 0 is treated as 1 (pass-through); configuration
    /// validation rejects it before it gets here.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Record one classification and return the current smoothed label.
    pub fn observe(&mut self, label: Label) -> Label {
        if self.capacity == 1 {
            self.window.clear();
            self.window.push_back(label.clone());
            return label;
        }

        let fallback = label.clone();
        self.window.push_back(label);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }
        self.tally().cloned().unwrap_or(fallback)
    }

    /// Majority label of the current window, `None` while empty.
    pub fn smoothed(&self) -> Option<Label> {
        self.tally().cloned()
    }

    fn tally(&self) -> Option<&Label> {
        let mut best: Option<(&Label, usize)> = None;
        for (i, candidate) in self.window.iter().enumerate() {
            // Each distinct label is tallied once, at its first occurrence
            if self.window.iter().take(i).any(|earlier| earlier == candidate) {
                continue;
            }
            let count = self.window.iter().filter(|l| *l == candidate).count();
            match best {
                Some((_, best_count)) if count <= best_count => {}
                _ => best = Some((candidate, count)),
            }
        }
        best.map(|(label, _)| label)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Window contents, oldest first.
    pub fn window(&self) -> impl Iterator<Item = &Label> {
        self.window.iter()
    }
}
