use std::sync::Arc;

use crate::action::ActionRef;
use crate::state::{FactKey, FactValue, StateRef};

/// One committed step: an action paired with the settings instance chosen
/// for it during the search.
pub struct PlanStep<K, V> {
    pub action: ActionRef<K, V>,
    pub settings: StateRef<K, V>,
}

impl<K, V> Clone for PlanStep<K, V> {
    fn clone(&self) -> Self {
        Self {
            action: Arc::clone(&self.action),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<K, V> PartialEq for PlanStep<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn eq(&self, other: &Self) -> bool {
        // Actions compare by identity, settings by value: the same action
        // re-parameterized is a different step.
        Arc::ptr_eq(&self.action, &other.action) && self.settings == other.settings
    }
}

impl<K, V> std::fmt::Debug for PlanStep<K, V>
where
    K: FactKey + std::fmt::Debug,
    V: FactValue + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanStep")
            .field("action", &self.action.name())
            .field("settings", &self.settings)
            .finish()
    }
}

/// An ordered action sequence, first-executed step first.
pub struct Plan<K, V> {
    steps: Vec<PlanStep<K, V>>,
}

impl<K, V> Plan<K, V> {
    pub fn new(steps: Vec<PlanStep<K, V>>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn steps(&self) -> &[PlanStep<K, V>] {
        &self.steps
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PlanStep<K, V>> {
        self.steps.iter()
    }
}

impl<K, V> Clone for Plan<K, V> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
        }
    }
}

impl<K, V> PartialEq for Plan<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn eq(&self, other: &Self) -> bool {
        self.steps == other.steps
    }
}

impl<K, V> std::fmt::Debug for Plan<K, V>
where
    K: FactKey + std::fmt::Debug,
    V: FactValue + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|s| s.action.name()))
            .finish()
    }
}

impl<'a, K, V> IntoIterator for &'a Plan<K, V> {
    type Item = &'a PlanStep<K, V>;
    type IntoIter = std::slice::Iter<'a, PlanStep<K, V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}
