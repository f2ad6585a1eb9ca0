//! Woodcutter demo: the classic three-step domain. The agent wants a fire,
//! which takes wood, which takes an axe.
//!
//! Run with `RUST_LOG=trace` to watch the search expand nodes.

use std::sync::{Arc, Mutex};

use goap_core::{
    Action, ActionContext, ActionRef, Agent, Goal, GoalRef, Memory, MemoryRef, Plan, SimpleMemory,
    State, StateRef,
};
use goap_planner::{Planner, PlannerConfig};
use tracing_subscriber::{fmt, EnvFilter};

type K = &'static str;

fn facts(entries: &[(K, bool)]) -> StateRef<K, bool> {
    Arc::new(entries.iter().copied().collect())
}

struct WoodcutterAction {
    name: &'static str,
    preconditions: StateRef<K, bool>,
    effects: StateRef<K, bool>,
    cost: u32,
}

impl WoodcutterAction {
    fn new(name: &'static str, pre: &[(K, bool)], eff: &[(K, bool)], cost: u32) -> ActionRef<K, bool> {
        Arc::new(Self {
            name,
            preconditions: facts(pre),
            effects: facts(eff),
            cost,
        })
    }
}

impl Action<K, bool> for WoodcutterAction {
    fn name(&self) -> &str {
        self.name
    }

    fn preconditions(&self, _ctx: &ActionContext<'_, K, bool>) -> StateRef<K, bool> {
        Arc::clone(&self.preconditions)
    }

    fn effects(&self, _ctx: &ActionContext<'_, K, bool>) -> StateRef<K, bool> {
        Arc::clone(&self.effects)
    }

    fn cost(&self, _ctx: &ActionContext<'_, K, bool>) -> u32 {
        self.cost
    }
}

struct StayWarm {
    required: StateRef<K, bool>,
    plan: Mutex<Option<Plan<K, bool>>>,
}

impl Goal<K, bool> for StayWarm {
    fn name(&self) -> &str {
        "stay_warm"
    }

    fn goal_state(&self) -> StateRef<K, bool> {
        Arc::clone(&self.required)
    }

    fn set_plan(&self, plan: Plan<K, bool>) {
        *self.plan.lock().unwrap() = Some(plan);
    }

    fn plan(&self) -> Option<Plan<K, bool>> {
        self.plan.lock().unwrap().clone()
    }
}

struct Woodcutter {
    memory: MemoryRef<K, bool>,
    goals: Vec<GoalRef<K, bool>>,
    actions: Vec<ActionRef<K, bool>>,
}

impl Agent<K, bool> for Woodcutter {
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

fn main() {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let agent = Woodcutter {
        memory: Arc::new(SimpleMemory::with_world(Arc::new(State::new()))),
        goals: vec![Arc::new(StayWarm {
            required: facts(&[("warm", true)]),
            plan: Mutex::new(None),
        })],
        actions: vec![
            WoodcutterAction::new("pickup_axe", &[], &[("has_axe", true)], 2),
            WoodcutterAction::new("chop_wood", &[("has_axe", true)], &[("has_wood", true)], 3),
            WoodcutterAction::new("make_fire", &[("has_wood", true)], &[("warm", true)], 1),
        ],
    };

    let mut planner = Planner::new(PlannerConfig {
        debug_plan: true,
        ..PlannerConfig::default()
    });
    planner.warm_up(32);

    match planner.plan(&agent, None, None, None) {
        Some(goal) => {
            let plan = goal.plan().expect("chosen goal carries its plan");
            println!("goal `{}` planned in {} steps:", goal.name(), plan.len());
            for (i, step) in plan.iter().enumerate() {
                println!("  {}. {}", i + 1, step.action.name());
            }
        }
        None => println!("no feasible goal"),
    }
}
