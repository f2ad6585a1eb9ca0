use std::sync::Arc;

use crate::agent::Agent;
use crate::state::{FactKey, FactValue, State, StateRef};

/// Shared handle to a domain action.
pub type ActionRef<K, V> = Arc<dyn Action<K, V>>;

/// Stack data handed to every action hook during a planning pass.
///
/// `next_action` is the action that will run *after* this one in the final
/// plan; expansion regresses from the goal, so the parent node's action is
/// the later step.
pub struct ActionContext<'a, K, V> {
    pub current_state: &'a StateRef<K, V>,
    pub goal_state: &'a StateRef<K, V>,
    pub agent: &'a dyn Agent<K, V>,
    pub next_action: Option<&'a ActionRef<K, V>>,
    pub settings: Option<&'a StateRef<K, V>>,
}

/// A domain action the planner can sequence.
///
/// The planner core only calls the planning surface (`precalculate`,
/// `settings`, `preconditions`, `effects`, `check_procedural_condition`,
/// `cost`). The lifecycle and interruption members exist for plan executors
/// and are never invoked during a search.
///
/// Hooks must return consistent data for a given context; returning
/// inconsistent preconditions/effects is a contract violation in domain code
/// and may panic the search rather than be silently tolerated.
pub trait Action<K, V>: Send + Sync
where
    K: FactKey,
    V: FactValue,
{
    fn name(&self) -> &str;

    /// Pre-expansion hook, run once per action per node expansion. Lets an
    /// action cache per-search-pass data; must not mutate runtime state.
    fn precalculate(&self, _ctx: &ActionContext<'_, K, V>) {}

    /// Candidate parameterizations for this expansion. Each settings blob
    /// yields one candidate child ("go to A" vs "go to B"). The default is a
    /// single empty settings state.
    fn settings(&self, _ctx: &ActionContext<'_, K, V>) -> Vec<StateRef<K, V>> {
        vec![Arc::new(State::new())]
    }

    /// Facts that must hold before this action can run.
    fn preconditions(&self, ctx: &ActionContext<'_, K, V>) -> StateRef<K, V>;

    /// Facts guaranteed to hold after this action ran.
    fn effects(&self, ctx: &ActionContext<'_, K, V>) -> StateRef<K, V>;

    /// Runtime check beyond fact preconditions (range checks and the like).
    fn check_procedural_condition(&self, _ctx: &ActionContext<'_, K, V>) -> bool {
        true
    }

    fn cost(&self, _ctx: &ActionContext<'_, K, V>) -> u32 {
        1
    }

    /// Called by an executor when a committed plan reaches this action.
    fn on_plan_enter(&self, _ctx: &ActionContext<'_, K, V>) {}

    /// Called by an executor when a committed plan moves past this action.
    fn on_plan_exit(&self, _ctx: &ActionContext<'_, K, V>) {}

    fn is_interruptable(&self) -> bool {
        true
    }

    /// Asks a running action to wind down at the next safe point.
    fn ask_for_interruption(&self) {}
}
