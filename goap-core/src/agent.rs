use std::sync::Arc;

use crate::action::ActionRef;
use crate::goal::GoalRef;
use crate::state::{FactKey, FactValue, State, StateRef};

/// Shared handle to an agent's memory.
pub type MemoryRef<K, V> = Arc<dyn Memory<K, V>>;

/// An agent's fact memory: the live world state as the agent knows it.
///
/// Sensors may write facts into the world state from another thread at any
/// time; `State`'s internal locking makes that safe without coordination.
pub trait Memory<K, V>: Send + Sync
where
    K: FactKey,
    V: FactValue,
{
    fn world_state(&self) -> StateRef<K, V>;
}

/// Minimal memory holding a single world state. Enough for most domains and
/// for tests; richer memories only need to produce the same handle.
pub struct SimpleMemory<K, V> {
    world: StateRef<K, V>,
}

impl<K, V> SimpleMemory<K, V>
where
    K: FactKey,
    V: FactValue,
{
    pub fn new() -> Self {
        Self {
            world: Arc::new(State::new()),
        }
    }

    pub fn with_world(world: StateRef<K, V>) -> Self {
        Self { world }
    }
}

impl<K, V> Default for SimpleMemory<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Memory<K, V> for SimpleMemory<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn world_state(&self) -> StateRef<K, V> {
        Arc::clone(&self.world)
    }
}

/// Pushes perceived facts into an agent's memory outside of planning.
///
/// Entirely optional: the planner only ever reads the resulting world state.
pub trait Sensor<K, V>: Send
where
    K: FactKey,
    V: FactValue,
{
    fn init(&mut self, memory: MemoryRef<K, V>);

    fn update(&mut self);
}

/// The planning subject: exposes memory, goals and actions to the planner.
///
/// All members must be safely callable from the planning thread while the
/// host mutates the agent elsewhere; returning snapshots (`Vec` of handles)
/// keeps that cheap to guarantee.
pub trait Agent<K, V>: Send + Sync
where
    K: FactKey,
    V: FactValue,
{
    fn memory(&self) -> MemoryRef<K, V>;

    fn current_goal(&self) -> Option<GoalRef<K, V>>;

    fn goals(&self) -> Vec<GoalRef<K, V>>;

    fn actions(&self) -> Vec<ActionRef<K, V>>;

    /// Factory for a fresh empty state of the agent's concrete fact types,
    /// for domain hooks that need scratch states of their own.
    fn instantiate_new_state(&self) -> StateRef<K, V> {
        Arc::new(State::new())
    }
}
