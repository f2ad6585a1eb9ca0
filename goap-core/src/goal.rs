use std::sync::Arc;

use crate::agent::Agent;
use crate::plan::Plan;
use crate::state::{FactKey, FactValue, StateRef};

/// Shared handle to a domain goal.
pub type GoalRef<K, V> = Arc<dyn Goal<K, V>>;

/// A competing objective the planner can try to achieve.
///
/// Implementations are read from the planning thread; plan storage therefore
/// takes `&self` and implementors guard it internally (a mutex around an
/// `Option<Plan>` is enough).
pub trait Goal<K, V>: Send + Sync
where
    K: FactKey,
    V: FactValue,
{
    fn name(&self) -> &str;

    /// The facts this goal requires to hold.
    fn goal_state(&self) -> StateRef<K, V>;

    /// Higher priority goals are searched first.
    fn priority(&self) -> i32 {
        1
    }

    /// Feasibility hook run once per planning pass, before `is_possible`.
    fn precalculate(&self, _agent: &dyn Agent<K, V>) {}

    /// Cheap "worth searching at all" test; impossible goals are pruned
    /// before any search runs.
    fn is_possible(&self) -> bool {
        true
    }

    /// Stores the committed plan on the goal.
    fn set_plan(&self, plan: Plan<K, V>);

    /// The currently stored plan, if any.
    fn plan(&self) -> Option<Plan<K, V>>;
}
