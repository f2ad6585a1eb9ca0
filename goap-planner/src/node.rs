use std::hash::Hash;
use std::sync::Arc;

use goap_core::{
    ActionContext, ActionRef, Agent, FactKey, FactValue, Plan, PlanStep, StatePool, StateRef,
    NO_STOP,
};

/// Index of a node inside a [`NodeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Shared inputs of one planning pass.
pub struct PlanContext<'a, K, V> {
    pub agent: &'a dyn Agent<K, V>,
    /// The live world state; goal-satisfaction tests run against this, not
    /// against the hypothetical per-path states.
    pub world: StateRef<K, V>,
    pub pool: &'a StatePool<K, V>,
    pub heuristic_weight: u32,
}

/// One step of a hypothetical plan.
///
/// Owns a pooled snapshot of the world as it would look after the path from
/// the root, the residual goal still to be explained, and the
/// preconditions/effects of the action that produced it (absent on the root).
pub struct SearchNode<K, V> {
    state: StateRef<K, V>,
    goal: StateRef<K, V>,
    /// Residual goal minus whatever the live world already supplies, cached
    /// at construction time. The node is a solution exactly when this is
    /// empty.
    goal_vs_world: StateRef<K, V>,
    action: Option<ActionRef<K, V>>,
    settings: Option<StateRef<K, V>>,
    preconditions: Option<StateRef<K, V>>,
    effects: Option<StateRef<K, V>>,
    parent: Option<NodeId>,
    g: u32,
    h: u32,
    f: u32,
}

impl<K, V> SearchNode<K, V>
where
    K: FactKey,
    V: FactValue,
{
    pub fn state(&self) -> &StateRef<K, V> {
        &self.state
    }

    pub fn goal(&self) -> &StateRef<K, V> {
        &self.goal
    }

    pub fn action(&self) -> Option<&ActionRef<K, V>> {
        self.action.as_ref()
    }

    pub fn preconditions(&self) -> Option<&StateRef<K, V>> {
        self.preconditions.as_ref()
    }

    pub fn effects(&self) -> Option<&StateRef<K, V>> {
        self.effects.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn path_cost(&self) -> u32 {
        self.g
    }

    pub fn heuristic(&self) -> u32 {
        self.h
    }

    pub fn total_cost(&self) -> u32 {
        self.f
    }

    /// Goal-reached test, independent of the search-path state: only the
    /// cached goal-vs-world difference decides.
    pub fn is_goal_satisfied(&self) -> bool {
        self.goal_vs_world.is_empty()
    }
}

impl<K, V> SearchNode<K, V>
where
    K: FactKey,
    V: FactValue + Hash,
{
    /// De-duplication key for the search engine: nodes with equal residual
    /// goals are interchangeable as search states.
    pub fn dedup_key(&self) -> u64 {
        self.goal.fingerprint()
    }
}

/// Index-addressed node storage, reused across search runs.
///
/// Nodes are recycled wholesale after a run; their pooled states go back to
/// the shared [`StatePool`] and the arena keeps its capacity for the next
/// pass.
pub struct NodeArena<K, V> {
    nodes: Vec<SearchNode<K, V>>,
}

impl<K, V> Default for NodeArena<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> NodeArena<K, V>
where
    K: FactKey,
    V: FactValue,
{
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Builds the root node: the agent's current world as the starting
    /// state, the caller-supplied goal as the residual goal, zero path cost.
    /// The arena takes ownership of `goal` (a pooled clone made by the
    /// caller).
    pub fn root(&mut self, ctx: &PlanContext<'_, K, V>, goal: StateRef<K, V>) -> NodeId {
        let state = ctx.pool.instantiate(Some(&ctx.world));
        let h = goal.len() as u32;
        let f = h.saturating_mul(ctx.heuristic_weight);
        let goal_vs_world = ctx.pool.instantiate(None);
        goal.missing_difference(&ctx.world, Some(&goal_vs_world), NO_STOP, None);
        self.push(SearchNode {
            state,
            goal,
            goal_vs_world,
            action: None,
            settings: None,
            preconditions: None,
            effects: None,
            parent: None,
            g: 0,
            h,
            f,
        })
    }

    /// Builds the child of `parent` produced by `(action, settings)`.
    ///
    /// The child clones the parent's state and goal, folds the action's
    /// effects into the state, shrinks the goal by those effects, and widens
    /// it with the action's preconditions so earlier plan steps must supply
    /// them.
    pub fn child(
        &mut self,
        ctx: &PlanContext<'_, K, V>,
        parent: NodeId,
        action: ActionRef<K, V>,
        settings: StateRef<K, V>,
    ) -> NodeId {
        let (parent_state, parent_goal, parent_action, parent_g) = {
            let p = &self.nodes[parent.0];
            (
                Arc::clone(&p.state),
                Arc::clone(&p.goal),
                p.action.clone(),
                p.g,
            )
        };

        let state = ctx.pool.instantiate(Some(&parent_state));
        let goal = ctx.pool.instantiate(Some(&parent_goal));
        let actx = ActionContext {
            current_state: &state,
            goal_state: &goal,
            agent: ctx.agent,
            next_action: parent_action.as_ref(),
            settings: Some(&settings),
        };
        let preconditions = action.preconditions(&actx);
        let effects = action.effects(&actx);
        let g = parent_g.saturating_add(action.cost(&actx));

        state.merge_from(&effects);
        goal.replace_with_missing_difference(&effects, NO_STOP, None);
        goal.merge_from(&preconditions);

        let h = goal.len() as u32;
        let f = g.saturating_add(h.saturating_mul(ctx.heuristic_weight));
        let goal_vs_world = ctx.pool.instantiate(None);
        goal.missing_difference(&ctx.world, Some(&goal_vs_world), NO_STOP, None);

        self.push(SearchNode {
            state,
            goal,
            goal_vs_world,
            action: Some(action),
            settings: Some(settings),
            preconditions: Some(preconditions),
            effects: Some(effects),
            parent: Some(parent),
            g,
            h,
            f,
        })
    }

    /// Expands `node` into child nodes by trying every agent action, in
    /// reverse registration order (stable tie-break), with every settings
    /// instantiation the action offers. Accepted children are appended to
    /// `out`.
    ///
    /// An `(action, settings)` pair is viable iff its effects touch the
    /// residual goal, conflict with neither the goal nor the goal-relaxed-by-
    /// its-own-effects preconditions, and the procedural condition holds.
    pub fn expand(
        &mut self,
        ctx: &PlanContext<'_, K, V>,
        node: NodeId,
        out: &mut Vec<NodeId>,
    ) {
        let (state, goal, parent_action) = {
            let n = &self.nodes[node.0];
            (Arc::clone(&n.state), Arc::clone(&n.goal), n.action.clone())
        };

        let actions = ctx.agent.actions();
        for action in actions.iter().rev() {
            let hook_ctx = ActionContext {
                current_state: &state,
                goal_state: &goal,
                agent: ctx.agent,
                next_action: parent_action.as_ref(),
                settings: None,
            };
            action.precalculate(&hook_ctx);
            for settings in action.settings(&hook_ctx) {
                let actx = ActionContext {
                    current_state: &state,
                    goal_state: &goal,
                    agent: ctx.agent,
                    next_action: parent_action.as_ref(),
                    settings: Some(&settings),
                };
                let preconditions = action.preconditions(&actx);
                let effects = action.effects(&actx);
                let viable = goal.has_any_match(&effects)
                    && !goal.has_any_conflict_fixed_by(&effects, &preconditions)
                    && !goal.has_any_conflict(&effects)
                    && action.check_procedural_condition(&actx);
                if viable {
                    out.push(self.child(ctx, node, Arc::clone(action), settings));
                }
            }
        }
    }

    /// Reconstructs the plan ending at `node` by walking parent links.
    ///
    /// Expansion regresses from the goal, so the node that satisfies the
    /// goal against the live world holds the first executable step; the walk
    /// towards the root therefore already yields execution order.
    pub fn plan_from(&self, node: NodeId) -> Plan<K, V> {
        let mut steps = Vec::new();
        let mut current = Some(node);
        while let Some(id) = current {
            let n = &self.nodes[id.0];
            if let (Some(action), Some(settings)) = (&n.action, &n.settings) {
                steps.push(PlanStep {
                    action: Arc::clone(action),
                    settings: Arc::clone(settings),
                });
            }
            current = n.parent;
        }
        Plan::new(steps)
    }

    /// Returns every node-owned state to the pool and empties the arena,
    /// keeping its capacity for the next run.
    pub fn recycle_all(&mut self, pool: &StatePool<K, V>) {
        for node in self.nodes.drain(..) {
            pool.recycle(node.state);
            pool.recycle(node.goal);
            pool.recycle(node.goal_vs_world);
        }
    }

    fn push(&mut self, node: SearchNode<K, V>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}

impl<K, V> std::ops::Index<NodeId> for NodeArena<K, V> {
    type Output = SearchNode<K, V>;

    fn index(&self, id: NodeId) -> &Self::Output {
        &self.nodes[id.0]
    }
}
