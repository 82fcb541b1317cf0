use super::route::Route;
use super::secret::SecretHash;
use super::serde_pairs;
use crate::error::{Result, TollError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// One FIFO of pending exits per route.
///
/// Empty queues are dropped so the map only holds routes that are waiting on
/// a price.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PendingQueues {
    #[serde(with = "serde_pairs")]
    queues: HashMap<Route, VecDeque<SecretHash>>,
}

impl PendingQueues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, route: Route, hash: SecretHash) {
        self.queues.entry(route).or_default().push_back(hash);
    }

    pub fn count(&self, route: &Route) -> usize {
        self.queues.get(route).map_or(0, VecDeque::len)
    }

    pub fn front(&self, route: &Route) -> Option<SecretHash> {
        self.queues.get(route).and_then(|queue| queue.front().copied())
    }

    /// The first `count` hashes in FIFO order, without removing them.
    ///
    /// Fails up front when the queue is shorter than `count`, so a caller that
    /// checks here before popping can never end up with a partial drain.
    pub fn peek_front(&self, route: &Route, count: usize) -> Result<Vec<SecretHash>> {
        if count == 0 {
            return Err(TollError::ZeroCount);
        }
        let available = self.count(route);
        if available < count {
            return Err(TollError::InsufficientQueue {
                requested: count,
                available,
            });
        }
        Ok(self
            .queues
            .get(route)
            .map(|queue| queue.iter().take(count).copied().collect())
            .unwrap_or_default())
    }

    pub fn pop_front(&mut self, route: &Route) -> Option<SecretHash> {
        let queue = self.queues.get_mut(route)?;
        let hash = queue.pop_front();
        if queue.is_empty() {
            self.queues.remove(route);
        }
        hash
    }

    pub fn total(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }

    /// Every queued hash with its route, each route in FIFO order.
    pub fn iter(&self) -> impl Iterator<Item = (&Route, SecretHash)> {
        self.queues
            .iter()
            .flat_map(|(route, queue)| queue.iter().map(move |hash| (route, *hash)))
    }
}
