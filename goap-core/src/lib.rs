//! Engine-agnostic GOAP kernel primitives.
//!
//! The planner operates purely on generic key/value facts: [`State`] is the
//! pooled fact store, and the [`Agent`] / [`Action`] / [`Goal`] traits are
//! the capability contracts domain code implements at the boundary.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![forbid(unsafe_code)]

pub mod action;
pub mod agent;
pub mod goal;
pub mod plan;
pub mod state;

pub use action::{Action, ActionContext, ActionRef};
pub use agent::{Agent, Memory, MemoryRef, Sensor, SimpleMemory};
pub use goal::{Goal, GoalRef};
pub use plan::{Plan, PlanStep};
pub use state::{FactKey, FactPredicate, FactValue, State, StatePool, StateRef, NO_STOP};
