//! The crawl frontier: a FIFO of URLs still to visit plus everything
//! already claimed.

use super::url::normalize_url;
use std::collections::{HashSet, VecDeque};

#[derive(Debug, Default)]
pub struct Frontier {
    visited: HashSet<String>,
    queued: HashSet<String>,
    queue: VecDeque<String>,
}

impl Frontier {
    /// A frontier holding only the normalised start URL.
    pub fn new(start_url: &str) -> Self {
        let mut frontier = Self::default();
        frontier.push(start_url);
        frontier
    }

    /// Enqueue `url` unless it was already visited or is already waiting.
    /// Returns whether it was added.
    pub fn push(&mut self, url: &str) -> bool {
        let url = normalize_url(url);
        if self.visited.contains(&url) || self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    /// Pop the next URL and mark it visited in one step, so no two
    /// callers can claim the same URL.
    pub fn claim_next(&mut self) -> Option<String> {
        while let Some(url) = self.queue.pop_front() {
            self.queued.remove(&url);
            if self.visited.insert(url.clone()) {
                return Some(url);
            }
        }
        None
    }

    #[cfg(test)]
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(&normalize_url(url))
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    #[cfg(test)]
    pub fn is_exhausted(&self) -> bool {
        self.queue.is_empty()
    }
}
