use std::hash::Hash;
use std::sync::Arc;

use goap_core::{
    ActionContext, Agent, FactKey, FactValue, GoalRef, Plan, StatePool, StateRef, NO_STOP,
};

use crate::astar::AStar;
use crate::node::{NodeArena, PlanContext};

/// Planning-pass tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlannerConfig {
    /// Budget of generated children per search run.
    pub max_iterations: usize,
    /// Frontier capacity; the search fails once the frontier nears it.
    pub max_nodes_to_expand: usize,
    /// Accept a satisfying child the moment it is generated instead of
    /// waiting for it to be the cheapest frontier entry.
    pub early_exit: bool,
    /// Actions are parameterized at expansion time; disables the static
    /// feasibility pre-check, which cannot see dynamic settings.
    pub dynamic_actions: bool,
    /// Weight applied to the residual-goal count in `f = g + h * weight`.
    pub heuristic_weight: u32,
    /// Emit per-node search traces at TRACE level.
    pub debug_plan: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            max_nodes_to_expand: 10_000,
            early_exit: false,
            dynamic_actions: false,
            heuristic_weight: 1,
            debug_plan: false,
        }
    }
}

/// Completion callback, invoked with the chosen goal (or `None`) after a
/// planning pass.
pub type PlanCallback<K, V> = Box<dyn FnOnce(Option<GoalRef<K, V>>) + Send>;

/// Selects among an agent's competing goals and drives the search.
///
/// One planner serves one planning thread; the state pool it owns is shared
/// with the nodes it builds and may be shared with domain code through
/// [`Planner::pool`].
pub struct Planner<K, V> {
    config: PlannerConfig,
    pool: StatePool<K, V>,
    arena: NodeArena<K, V>,
    astar: AStar,
}

impl<K, V> Planner<K, V>
where
    K: FactKey,
    V: FactValue + Hash,
{
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            pool: StatePool::new(),
            arena: NodeArena::new(),
            astar: AStar::new(config.max_nodes_to_expand),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn pool(&self) -> &StatePool<K, V> {
        &self.pool
    }

    /// Pre-populates the state pool so the first planning pass does not pay
    /// for its allocations.
    pub fn warm_up(&self, states: usize) {
        self.pool.warmup(states);
    }

    /// One planning pass: enumerate the agent's goals (minus
    /// `blacklist_goal`), prune the impossible ones, and search them highest
    /// priority first until one yields a plan worth committing.
    ///
    /// A plan identical to `current_plan` is discarded: the agent is already
    /// executing it. The chosen goal (with its plan stored) is handed to
    /// `callback` and returned; `None` means no feasible goal this pass.
    pub fn plan(
        &mut self,
        agent: &dyn Agent<K, V>,
        blacklist_goal: Option<&GoalRef<K, V>>,
        current_plan: Option<&Plan<K, V>>,
        callback: Option<PlanCallback<K, V>>,
    ) -> Option<GoalRef<K, V>> {
        let world = agent.memory().world_state();

        let mut goals: Vec<GoalRef<K, V>> = agent
            .goals()
            .into_iter()
            .filter(|goal| blacklist_goal.is_none_or(|b| !Arc::ptr_eq(b, goal)))
            .collect();
        for goal in &goals {
            goal.precalculate(agent);
        }
        goals.retain(|goal| goal.is_possible());
        // Ascending sort, so popping from the back tries the highest
        // priority goal first.
        goals.sort_by_key(|goal| goal.priority());

        let mut chosen: Option<GoalRef<K, V>> = None;
        while let Some(goal) = goals.pop() {
            if !self.config.dynamic_actions && !self.goal_reachable(agent, &world, &goal) {
                tracing::debug!(
                    goal = goal.name(),
                    "no action ordering can reach this goal, skipping search"
                );
                continue;
            }

            self.arena.recycle_all(&self.pool);
            let ctx = PlanContext {
                agent,
                world: Arc::clone(&world),
                pool: &self.pool,
                heuristic_weight: self.config.heuristic_weight,
            };
            let goal_state = self.pool.instantiate(Some(&goal.goal_state()));
            let root = self.arena.root(&ctx, goal_state);

            match self.astar.run(
                &mut self.arena,
                &ctx,
                root,
                self.config.max_iterations,
                self.config.early_exit,
                self.config.debug_plan,
            ) {
                Err(err) => {
                    tracing::debug!(goal = goal.name(), error = %err, "no plan found");
                    continue;
                }
                Ok(leaf) => {
                    let plan = self.arena.plan_from(leaf);
                    if plan.is_empty() {
                        continue;
                    }
                    if current_plan.is_some_and(|current| *current == plan) {
                        tracing::debug!(
                            goal = goal.name(),
                            "already executing this exact plan, discarding"
                        );
                        continue;
                    }
                    tracing::debug!(goal = goal.name(), steps = plan.len(), "plan committed");
                    goal.set_plan(plan);
                    chosen = Some(goal);
                    break;
                }
            }
        }

        if let Some(callback) = callback {
            callback(chosen.clone());
        }
        chosen
    }

    /// Cheap forward-chaining feasibility pre-check: subtract the effects of
    /// every action whose procedural condition currently holds from the
    /// goal's requirements, then subtract the live world state. Anything
    /// left over cannot be achieved by any ordering of current actions, so
    /// the expensive search is skipped.
    fn goal_reachable(
        &self,
        agent: &dyn Agent<K, V>,
        world: &StateRef<K, V>,
        goal: &GoalRef<K, V>,
    ) -> bool {
        let required = goal.goal_state();
        let mut outstanding = self.pool.instantiate(Some(&required));

        for action in agent.actions() {
            let ctx = ActionContext {
                current_state: world,
                goal_state: &required,
                agent,
                next_action: None,
                settings: None,
            };
            action.precalculate(&ctx);
            if !action.check_procedural_condition(&ctx) {
                continue;
            }
            let effects = action.effects(&ctx);
            let next = self.pool.instantiate(None);
            outstanding.missing_difference(&effects, Some(&next), NO_STOP, None);
            self.pool.recycle(outstanding);
            outstanding = next;
        }

        let leftover = self.pool.instantiate(None);
        let missing = outstanding.missing_difference(world, Some(&leftover), NO_STOP, None);
        self.pool.recycle(outstanding);
        self.pool.recycle(leftover);
        missing == 0
    }
}
