use std::sync::{Arc, Mutex};

use goap_core::{
    Action, ActionContext, ActionRef, Agent, Goal, GoalRef, Memory, MemoryRef, Plan, SimpleMemory,
    StateRef,
};
use goap_planner::{Planner, PlannerConfig};

type K = &'static str;

fn facts(entries: &[(K, bool)]) -> StateRef<K, bool> {
    Arc::new(entries.iter().copied().collect())
}

struct TestAction {
    name: &'static str,
    preconditions: StateRef<K, bool>,
    effects: StateRef<K, bool>,
    cost: u32,
    enabled: bool,
}

impl TestAction {
    fn new(
        name: &'static str,
        pre: &[(K, bool)],
        eff: &[(K, bool)],
        cost: u32,
    ) -> ActionRef<K, bool> {
        Arc::new(Self {
            name,
            preconditions: facts(pre),
            effects: facts(eff),
            cost,
            enabled: true,
        })
    }

    fn disabled(
        name: &'static str,
        pre: &[(K, bool)],
        eff: &[(K, bool)],
        cost: u32,
    ) -> ActionRef<K, bool> {
        Arc::new(Self {
            name,
            preconditions: facts(pre),
            effects: facts(eff),
            cost,
            enabled: false,
        })
    }
}

impl Action<K, bool> for TestAction {
    fn name(&self) -> &str {
        self.name
    }

    fn preconditions(&self, _ctx: &ActionContext<'_, K, bool>) -> StateRef<K, bool> {
        Arc::clone(&self.preconditions)
    }

    fn effects(&self, _ctx: &ActionContext<'_, K, bool>) -> StateRef<K, bool> {
        Arc::clone(&self.effects)
    }

    fn check_procedural_condition(&self, _ctx: &ActionContext<'_, K, bool>) -> bool {
        self.enabled
    }

    fn cost(&self, _ctx: &ActionContext<'_, K, bool>) -> u32 {
        self.cost
    }
}

struct TestGoal {
    name: &'static str,
    required: StateRef<K, bool>,
    priority: i32,
    possible: bool,
    plan: Mutex<Option<Plan<K, bool>>>,
}

impl TestGoal {
    fn new(name: &'static str, required: &[(K, bool)], priority: i32) -> Arc<Self> {
        Arc::new(Self {
            name,
            required: facts(required),
            priority,
            possible: true,
            plan: Mutex::new(None),
        })
    }

    fn impossible(name: &'static str, required: &[(K, bool)], priority: i32) -> Arc<Self> {
        Arc::new(Self {
            name,
            required: facts(required),
            priority,
            possible: false,
            plan: Mutex::new(None),
        })
    }
}

impl Goal<K, bool> for TestGoal {
    fn name(&self) -> &str {
        self.name
    }

    fn goal_state(&self) -> StateRef<K, bool> {
        Arc::clone(&self.required)
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_possible(&self) -> bool {
        self.possible
    }

    fn set_plan(&self, plan: Plan<K, bool>) {
        *self.plan.lock().unwrap() = Some(plan);
    }

    fn plan(&self) -> Option<Plan<K, bool>> {
        self.plan.lock().unwrap().clone()
    }
}

struct TestAgent {
    memory: MemoryRef<K, bool>,
    goals: Vec<GoalRef<K, bool>>,
    actions: Vec<ActionRef<K, bool>>,
}

impl TestAgent {
    fn new(
        world: &[(K, bool)],
        goals: Vec<GoalRef<K, bool>>,
        actions: Vec<ActionRef<K, bool>>,
    ) -> Self {
        Self {
            memory: Arc::new(SimpleMemory::with_world(facts(world))),
            goals,
            actions,
        }
    }
}

impl Agent<K, bool> for TestAgent {
    fn memory(&self) -> MemoryRef<K, bool> {
        Arc::clone(&self.memory)
    }

    fn current_goal(&self) -> Option<GoalRef<K, bool>> {
        None
    }

    fn goals(&self) -> Vec<GoalRef<K, bool>> {
        self.goals.clone()
    }

    fn actions(&self) -> Vec<ActionRef<K, bool>> {
        self.actions.clone()
    }
}

fn step_names(plan: &Plan<K, bool>) -> Vec<&str> {
    plan.iter().map(|s| s.action.name()).collect()
}

#[test]
fn trivial_one_step_plan() {
    let goal = TestGoal::new("get_axe", &[("has_axe", true)], 1);
    let agent = TestAgent::new(
        &[("has_axe", false)],
        vec![goal.clone()],
        vec![TestAction::new("pickup_axe", &[], &[("has_axe", true)], 1)],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    let chosen = planner.plan(&agent, None, None, None).expect("plan");
    assert_eq!(chosen.name(), "get_axe");
    assert_eq!(step_names(&goal.plan().unwrap()), ["pickup_axe"]);
}

#[test]
fn unreachable_goal_yields_no_plan() {
    let goal = TestGoal::new("get_sword", &[("has_sword", true)], 1);
    let agent = TestAgent::new(
        &[],
        vec![goal.clone()],
        vec![TestAction::new("pickup_axe", &[], &[("has_axe", true)], 1)],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    assert!(planner.plan(&agent, None, None, None).is_none());
    assert!(goal.plan().is_none());

    // Dynamic actions skip the static pre-check; the search itself must
    // still fail cleanly.
    let mut planner = Planner::new(PlannerConfig {
        dynamic_actions: true,
        ..PlannerConfig::default()
    });
    assert!(planner.plan(&agent, None, None, None).is_none());
}

#[test]
fn chained_plan_comes_out_in_execution_order() {
    let goal = TestGoal::new("get_warm", &[("warm", true)], 1);
    let agent = TestAgent::new(
        &[],
        vec![goal.clone()],
        vec![
            TestAction::new("pickup_axe", &[], &[("has_axe", true)], 1),
            TestAction::new("chop_wood", &[("has_axe", true)], &[("has_wood", true)], 1),
            TestAction::new("make_fire", &[("has_wood", true)], &[("warm", true)], 1),
        ],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    planner.plan(&agent, None, None, None).expect("plan");
    assert_eq!(
        step_names(&goal.plan().unwrap()),
        ["pickup_axe", "chop_wood", "make_fire"]
    );
}

#[test]
fn equal_cost_alternatives_resolve_deterministically() {
    // Two actions satisfy the same goal at equal cost; a fixed registration
    // order must give a fixed winner, every time.
    let actions = || {
        vec![
            TestAction::new("front_door", &[], &[("inside", true)], 1),
            TestAction::new("back_door", &[], &[("inside", true)], 1),
        ]
    };

    let mut winners = Vec::new();
    for _ in 0..4 {
        let goal = TestGoal::new("get_inside", &[("inside", true)], 1);
        let agent = TestAgent::new(&[], vec![goal.clone()], actions());
        let mut planner = Planner::new(PlannerConfig::default());
        planner.plan(&agent, None, None, None).expect("plan");
        let plan = goal.plan().unwrap();
        assert_eq!(plan.len(), 1);
        winners.push(plan.steps()[0].action.name().to_string());
    }
    winners.dedup();
    assert_eq!(winners.len(), 1);
}

#[test]
fn iteration_budget_fails_cleanly() {
    let goal = TestGoal::new("get_warm", &[("warm", true)], 1);
    let agent = TestAgent::new(
        &[],
        vec![goal.clone()],
        vec![
            TestAction::new("pickup_axe", &[], &[("has_axe", true)], 1),
            TestAction::new("chop_wood", &[("has_axe", true)], &[("has_wood", true)], 1),
            TestAction::new("make_fire", &[("has_wood", true)], &[("warm", true)], 1),
        ],
    );

    let mut planner = Planner::new(PlannerConfig {
        max_iterations: 1,
        ..PlannerConfig::default()
    });
    assert!(planner.plan(&agent, None, None, None).is_none());
}

#[test]
fn highest_priority_feasible_goal_wins() {
    let eat = TestGoal::new("eat", &[("fed", true)], 1);
    let survive = TestGoal::new("survive", &[("safe", true)], 9);
    let agent = TestAgent::new(
        &[],
        vec![eat.clone(), survive.clone()],
        vec![
            TestAction::new("cook", &[], &[("fed", true)], 1),
            TestAction::new("hide", &[], &[("safe", true)], 1),
        ],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    let chosen = planner.plan(&agent, None, None, None).expect("plan");
    assert_eq!(chosen.name(), "survive");
    assert!(survive.plan().is_some());
    assert!(eat.plan().is_none());
}

#[test]
fn blacklisted_goal_is_skipped() {
    let eat = TestGoal::new("eat", &[("fed", true)], 1);
    let survive = TestGoal::new("survive", &[("safe", true)], 9);
    let survive_ref: GoalRef<K, bool> = survive.clone();
    let agent = TestAgent::new(
        &[],
        vec![eat.clone(), survive.clone()],
        vec![
            TestAction::new("cook", &[], &[("fed", true)], 1),
            TestAction::new("hide", &[], &[("safe", true)], 1),
        ],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    let chosen = planner
        .plan(&agent, Some(&survive_ref), None, None)
        .expect("plan");
    assert_eq!(chosen.name(), "eat");
}

#[test]
fn impossible_goals_are_pruned_before_searching() {
    let goal = TestGoal::impossible("wish", &[("granted", true)], 9);
    let fallback = TestGoal::new("walk", &[("moved", true)], 1);
    let agent = TestAgent::new(
        &[],
        vec![goal.clone(), fallback.clone()],
        vec![
            TestAction::new("grant", &[], &[("granted", true)], 1),
            TestAction::new("step", &[], &[("moved", true)], 1),
        ],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    let chosen = planner.plan(&agent, None, None, None).expect("plan");
    assert_eq!(chosen.name(), "walk");
    assert!(goal.plan().is_none());
}

#[test]
fn already_satisfied_goal_produces_no_plan() {
    // The root node satisfies the goal immediately; an empty plan is not
    // worth committing.
    let goal = TestGoal::new("get_axe", &[("has_axe", true)], 1);
    let agent = TestAgent::new(
        &[("has_axe", true)],
        vec![goal.clone()],
        vec![TestAction::new("pickup_axe", &[], &[("has_axe", true)], 1)],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    assert!(planner.plan(&agent, None, None, None).is_none());
    assert!(goal.plan().is_none());
}

#[test]
fn identical_current_plan_is_not_recommitted() {
    let goal = TestGoal::new("get_axe", &[("has_axe", true)], 1);
    let agent = TestAgent::new(
        &[("has_axe", false)],
        vec![goal.clone()],
        vec![TestAction::new("pickup_axe", &[], &[("has_axe", true)], 1)],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    planner.plan(&agent, None, None, None).expect("plan");
    let running = goal.plan().unwrap();

    // Same world, same goal: the search finds the same plan again, which is
    // exactly what the agent is already executing.
    assert!(planner.plan(&agent, None, Some(&running), None).is_none());
}

#[test]
fn callback_receives_the_outcome() {
    let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));

    let goal = TestGoal::new("get_axe", &[("has_axe", true)], 1);
    let agent = TestAgent::new(
        &[("has_axe", false)],
        vec![goal.clone()],
        vec![TestAction::new("pickup_axe", &[], &[("has_axe", true)], 1)],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    let sink = Arc::clone(&seen);
    planner.plan(
        &agent,
        None,
        None,
        Some(Box::new(move |chosen| {
            sink.lock()
                .unwrap()
                .push(chosen.map(|g| g.name().to_string()));
        })),
    );

    let hopeless = TestGoal::new("get_sword", &[("has_sword", true)], 1);
    let agent = TestAgent::new(&[], vec![hopeless], vec![]);
    let sink = Arc::clone(&seen);
    planner.plan(
        &agent,
        None,
        None,
        Some(Box::new(move |chosen| {
            sink.lock()
                .unwrap()
                .push(chosen.map(|g| g.name().to_string()));
        })),
    );

    let seen = seen.lock().unwrap();
    assert_eq!(*seen, vec![Some("get_axe".to_string()), None]);
}

#[test]
fn procedurally_disabled_action_is_never_planned() {
    let goal = TestGoal::new("get_inside", &[("inside", true)], 1);
    let agent = TestAgent::new(
        &[],
        vec![goal.clone()],
        vec![
            TestAction::disabled("teleport", &[], &[("inside", true)], 0),
            TestAction::new("walk_in", &[], &[("inside", true)], 5),
        ],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    planner.plan(&agent, None, None, None).expect("plan");
    assert_eq!(step_names(&goal.plan().unwrap()), ["walk_in"]);
}

#[test]
fn conflicting_effects_disqualify_an_action() {
    // "burn_house" would warm the agent but contradicts the goal's demand
    // that the house still stands.
    let goal = TestGoal::new(
        "get_warm_safely",
        &[("warm", true), ("house_intact", true)],
        1,
    );
    let agent = TestAgent::new(
        &[("house_intact", true)],
        vec![goal.clone()],
        vec![
            TestAction::new(
                "burn_house",
                &[],
                &[("warm", true), ("house_intact", false)],
                1,
            ),
            TestAction::new("light_stove", &[], &[("warm", true)], 2),
        ],
    );

    let mut planner = Planner::new(PlannerConfig::default());
    planner.plan(&agent, None, None, None).expect("plan");
    assert_eq!(step_names(&goal.plan().unwrap()), ["light_stove"]);
}

struct DeliverAction;

impl Action<K, bool> for DeliverAction {
    fn name(&self) -> &str {
        "deliver"
    }

    fn settings(&self, _ctx: &ActionContext<'_, K, bool>) -> Vec<StateRef<K, bool>> {
        vec![facts(&[("route_b", false)]), facts(&[("route_b", true)])]
    }

    fn preconditions(&self, _ctx: &ActionContext<'_, K, bool>) -> StateRef<K, bool> {
        facts(&[])
    }

    fn effects(&self, ctx: &ActionContext<'_, K, bool>) -> StateRef<K, bool> {
        // Only parameterized instantiations deliver anything; the static
        // feasibility pre-check sees no effects at all.
        match ctx.settings {
            Some(_) => facts(&[("delivered", true)]),
            None => facts(&[]),
        }
    }

    fn cost(&self, ctx: &ActionContext<'_, K, bool>) -> u32 {
        match ctx.settings {
            Some(settings) if settings.get(&"route_b") == Some(true) => 1,
            _ => 3,
        }
    }
}

#[test]
fn dynamic_actions_bypass_the_static_pre_check() {
    let make_agent = || {
        let goal = TestGoal::new("deliver_parcel", &[("delivered", true)], 1);
        let agent = TestAgent::new(&[], vec![goal.clone()], vec![Arc::new(DeliverAction)]);
        (goal, agent)
    };

    // The pre-check sees no effects and rejects the goal outright.
    let (goal, agent) = make_agent();
    let mut planner = Planner::new(PlannerConfig::default());
    assert!(planner.plan(&agent, None, None, None).is_none());
    assert!(goal.plan().is_none());

    // With dynamic actions the search sees the parameterized effects and
    // picks the cheaper route.
    let (goal, agent) = make_agent();
    let mut planner = Planner::new(PlannerConfig {
        dynamic_actions: true,
        ..PlannerConfig::default()
    });
    planner.plan(&agent, None, None, None).expect("plan");
    let plan = goal.plan().unwrap();
    assert_eq!(step_names(&plan), ["deliver"]);
    assert_eq!(plan.steps()[0].settings.get(&"route_b"), Some(true));
}

#[test]
fn early_exit_still_finds_a_plan() {
    let goal = TestGoal::new("get_warm", &[("warm", true)], 1);
    let agent = TestAgent::new(
        &[],
        vec![goal.clone()],
        vec![
            TestAction::new("pickup_axe", &[], &[("has_axe", true)], 1),
            TestAction::new("chop_wood", &[("has_axe", true)], &[("has_wood", true)], 1),
            TestAction::new("make_fire", &[("has_wood", true)], &[("warm", true)], 1),
        ],
    );

    let mut planner = Planner::new(PlannerConfig {
        early_exit: true,
        ..PlannerConfig::default()
    });
    planner.plan(&agent, None, None, None).expect("plan");
    assert_eq!(
        step_names(&goal.plan().unwrap()),
        ["pickup_axe", "chop_wood", "make_fire"]
    );
}

#[test]
fn repeated_passes_reuse_pooled_states() {
    let actions = vec![
        TestAction::new("pickup_axe", &[], &[("has_axe", true)], 1),
        TestAction::new("chop_wood", &[("has_axe", true)], &[("has_wood", true)], 1),
        TestAction::new("make_fire", &[("has_wood", true)], &[("warm", true)], 1),
    ];

    let mut planner = Planner::new(PlannerConfig::default());
    planner.warm_up(32);

    for _ in 0..3 {
        let goal = TestGoal::new("get_warm", &[("warm", true)], 1);
        let agent = TestAgent::new(&[], vec![goal.clone()], actions.clone());
        planner.plan(&agent, None, None, None).expect("plan");
        assert_eq!(goal.plan().unwrap().len(), 3);
    }
}
