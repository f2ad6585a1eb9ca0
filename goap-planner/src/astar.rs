use core::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};
use std::hash::Hash;

use goap_core::{FactKey, FactValue};
use thiserror::Error;

use crate::node::{NodeArena, NodeId, PlanContext};

/// Why a search run produced no plan. None of these are fatal: the planner
/// simply moves on to the next candidate goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchError {
    #[error("frontier exhausted without reaching the goal")]
    FrontierExhausted,
    #[error("iteration budget exhausted after {0} iterations")]
    IterationBudget(usize),
    #[error("frontier capacity of {0} nodes reached")]
    CapacityReached(usize),
}

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: u32,
    g: u32,
    tie: u64,
    node: NodeId,
    key: u64,
}

impl OpenEntry {
    fn heap_key(&self) -> (u32, u32, u64) {
        (self.f, self.g, self.tie)
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.heap_key() == other.heap_key()
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering to make BinaryHeap behave like a min-heap. The
        // insertion counter keeps equal-cost entries distinct and ordered.
        other.heap_key().cmp(&self.heap_key())
    }
}

/// Best-first search over dynamically expanded nodes.
///
/// Bookkeeping (frontier, explored set, best-cost map) is private to one
/// [`run`] invocation; the maps are keyed by the nodes' residual-goal
/// fingerprints. Construction fixes the frontier capacity.
///
/// [`run`]: AStar::run
pub struct AStar {
    capacity: usize,
    frontier: BinaryHeap<OpenEntry>,
    /// Best frontier entry per search state; superseded heap entries are
    /// skipped lazily on pop.
    state_to_node: HashMap<u64, (NodeId, u32)>,
    explored: HashMap<u64, NodeId>,
    children: Vec<NodeId>,
    tie: u64,
}

impl AStar {
    pub fn new(max_nodes_to_expand: usize) -> Self {
        Self {
            capacity: max_nodes_to_expand,
            frontier: BinaryHeap::with_capacity(max_nodes_to_expand.min(1024)),
            state_to_node: HashMap::new(),
            explored: HashMap::new(),
            children: Vec::new(),
            tie: 0,
        }
    }

    /// Runs the search from `start` until a node's cached goal-vs-world
    /// difference is empty, or a budget runs out.
    ///
    /// `max_iterations` counts generated children; `early_exit` accepts a
    /// satisfying child the moment it is generated, trading optimality for
    /// latency.
    pub fn run<K, V>(
        &mut self,
        arena: &mut NodeArena<K, V>,
        ctx: &PlanContext<'_, K, V>,
        start: NodeId,
        max_iterations: usize,
        early_exit: bool,
        debug_plan: bool,
    ) -> Result<NodeId, SearchError>
    where
        K: FactKey,
        V: FactValue + Hash,
    {
        self.frontier.clear();
        self.state_to_node.clear();
        self.explored.clear();
        self.tie = 0;

        self.push(start, arena[start].dedup_key(), arena[start].total_cost(), arena[start].path_cost());

        let mut iterations = 0usize;
        loop {
            if iterations >= max_iterations {
                return Err(SearchError::IterationBudget(iterations));
            }
            if self.frontier.len() + 1 >= self.capacity {
                return Err(SearchError::CapacityReached(self.capacity));
            }
            let Some(entry) = self.frontier.pop() else {
                return Err(SearchError::FrontierExhausted);
            };
            if self.explored.contains_key(&entry.key)
                || self
                    .state_to_node
                    .get(&entry.key)
                    .is_some_and(|&(id, _)| id != entry.node)
            {
                // Superseded while queued, or its state was already expanded
                // through the superseding entry.
                continue;
            }

            if debug_plan {
                tracing::trace!(
                    f = entry.f,
                    g = entry.g,
                    residual = arena[entry.node].goal().len(),
                    "expanding node"
                );
            }

            if arena[entry.node].is_goal_satisfied() {
                return Ok(entry.node);
            }
            self.explored.insert(entry.key, entry.node);
            self.state_to_node.remove(&entry.key);

            let mut children = std::mem::take(&mut self.children);
            children.clear();
            arena.expand(ctx, entry.node, &mut children);

            let mut found: Option<NodeId> = None;
            for &child in children.iter() {
                iterations += 1;
                if early_exit && arena[child].is_goal_satisfied() {
                    found = Some(child);
                    break;
                }
                let key = arena[child].dedup_key();
                if self.explored.contains_key(&key) {
                    continue;
                }
                let f = arena[child].total_cost();
                if let Some(&(_, existing_f)) = self.state_to_node.get(&key) {
                    if existing_f <= f {
                        // An equal-or-cheaper node for this state is already
                        // queued; skip the child but keep processing its
                        // siblings.
                        continue;
                    }
                    // Strictly cheaper: supersede the queued entry, which
                    // turns stale and is dropped on pop.
                }
                self.push(child, key, f, arena[child].path_cost());
            }
            self.children = children;
            if let Some(node) = found {
                return Ok(node);
            }
        }
    }

    fn push(&mut self, node: NodeId, key: u64, f: u32, g: u32) {
        self.frontier.push(OpenEntry {
            f,
            g,
            tie: self.tie,
            node,
            key,
        });
        self.tie += 1;
        self.state_to_node.insert(key, (node, f));
    }
}
