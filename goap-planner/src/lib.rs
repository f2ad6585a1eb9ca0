//! Deterministic best-first GOAP planning over generic fact states.
//!
//! The search regresses from a goal: each expansion picks an action whose
//! effects explain part of the residual goal and pushes the action's
//! preconditions onto what earlier steps must still supply. A node is a
//! solution when its residual goal, checked against the live world state,
//! has nothing outstanding.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod astar;
pub mod node;
pub mod planner;

pub use astar::{AStar, SearchError};
pub use node::{NodeArena, NodeId, PlanContext, SearchNode};
pub use planner::{PlanCallback, Planner, PlannerConfig};
