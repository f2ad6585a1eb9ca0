use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Fact identity. Blanket-implemented; callers never implement this by hand.
pub trait FactKey: Clone + Eq + Hash + Send + Sync + 'static {}
impl<T> FactKey for T where T: Clone + Eq + Hash + Send + Sync + 'static {}

/// Fact value. Only equality is required; the planner adds `Hash` for its
/// de-duplication fingerprints.
pub trait FactValue: Clone + Eq + Send + Sync + 'static {}
impl<T> FactValue for T where T: Clone + Eq + Send + Sync + 'static {}

/// Shared handle to a pooled state.
pub type StateRef<K, V> = Arc<State<K, V>>;

/// Per-fact filter used by the diff operations.
pub type FactPredicate<K, V> = dyn Fn(&K, &V) -> bool;

/// No early stop for the diff operations.
pub const NO_STOP: usize = usize::MAX;

struct Buffers<K, V> {
    values: HashMap<K, V>,
    scratch: HashMap<K, V>,
}

/// A mutable mapping of fact key to fact value.
///
/// Absence of a key means "fact unknown", which is distinct from any explicit
/// value. Storage is guarded by a per-instance mutex so a sensor thread can
/// write facts while a planning thread reads them; operations touching two
/// states acquire both locks ordered by instance address.
///
/// The second internal buffer lets [`replace_with_missing_difference`] narrow
/// a state in place with a buffer swap instead of a fresh allocation.
///
/// [`replace_with_missing_difference`]: State::replace_with_missing_difference
pub struct State<K, V> {
    inner: Mutex<Buffers<K, V>>,
}

impl<K, V> State<K, V>
where
    K: FactKey,
    V: FactValue,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Buffers {
                values: HashMap::new(),
                scratch: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Buffers<K, V>> {
        // A poisoning panic cannot leave the maps structurally broken, so
        // recover the guard instead of propagating the poison.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Locks `a` and `b` in address order so that concurrent two-state
    /// operations can never deadlock. Callers must rule out aliasing first.
    fn lock_pair<'a>(
        a: &'a Self,
        b: &'a Self,
    ) -> (MutexGuard<'a, Buffers<K, V>>, MutexGuard<'a, Buffers<K, V>>) {
        debug_assert!(
            !std::ptr::eq(a, b),
            "state locked against itself; alias cases are handled by the caller"
        );
        if (a as *const Self as usize) < (b as *const Self as usize) {
            let ga = a.lock();
            let gb = b.lock();
            (ga, gb)
        } else {
            let gb = b.lock();
            let ga = a.lock();
            (ga, gb)
        }
    }

    /// Locks `a`, `b` and `c` in address order, so three-state operations
    /// share the same global lock order as [`lock_pair`]. Guards come back in
    /// argument order. Callers must rule out aliasing first.
    ///
    /// [`lock_pair`]: State::lock_pair
    fn lock_trio<'a>(
        a: &'a Self,
        b: &'a Self,
        c: &'a Self,
    ) -> (
        MutexGuard<'a, Buffers<K, V>>,
        MutexGuard<'a, Buffers<K, V>>,
        MutexGuard<'a, Buffers<K, V>>,
    ) {
        debug_assert!(
            !std::ptr::eq(a, b) && !std::ptr::eq(b, c) && !std::ptr::eq(a, c),
            "state locked against itself; alias cases are handled by the caller"
        );
        let addr = |s: &Self| s as *const Self as usize;
        if addr(a) < addr(b) && addr(a) < addr(c) {
            let ga = a.lock();
            let (gb, gc) = Self::lock_pair(b, c);
            (ga, gb, gc)
        } else if addr(b) < addr(c) {
            let gb = b.lock();
            let (ga, gc) = Self::lock_pair(a, c);
            (ga, gb, gc)
        } else {
            let gc = c.lock();
            let (ga, gb) = Self::lock_pair(a, b);
            (ga, gb, gc)
        }
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.lock().values.get(key).cloned()
    }

    pub fn set(&self, key: K, value: V) {
        self.lock().values.insert(key, value);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.lock().values.remove(key)
    }

    pub fn has(&self, key: &K) -> bool {
        self.lock().values.contains_key(key)
    }

    pub fn clear(&self) {
        self.lock().values.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().values.is_empty()
    }

    /// Snapshot of the current entries, in unspecified order.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.lock()
            .values
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Copies every entry of `other` into `self`, overwriting on collision.
    pub fn merge_from(&self, other: &Self) {
        if std::ptr::eq(self, other) {
            return;
        }
        let (mut a, b) = Self::lock_pair(self, other);
        for (k, v) in b.values.iter() {
            a.values.insert(k.clone(), v.clone());
        }
    }

    /// True if any key present in both states carries an equal value.
    ///
    /// Used as a cheap "does this touch the goal at all" pre-filter.
    pub fn has_any_match(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return !self.is_empty();
        }
        let (a, b) = Self::lock_pair(self, other);
        b.values
            .iter()
            .any(|(k, v)| a.values.get(k).is_some_and(|mine| mine == v))
    }

    /// True if any key present in both states carries a different value.
    pub fn has_any_conflict(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return false;
        }
        let (a, b) = Self::lock_pair(self, other);
        b.values
            .iter()
            .any(|(k, v)| a.values.get(k).is_some_and(|mine| mine != v))
    }

    /// Relaxed conflict test: a mismatch between `self` and `other` is
    /// tolerated when `changes` independently supplies the value `other`
    /// wants for that key, i.e. a later fix-up exists.
    pub fn has_any_conflict_fixed_by(&self, changes: &Self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return false;
        }
        if std::ptr::eq(changes, other) {
            // Every mismatch would be fixed by `other` itself.
            return false;
        }
        if std::ptr::eq(changes, self) {
            // `self` cannot fix a value it already disagrees on.
            return self.has_any_conflict(other);
        }
        let (a, c, b) = Self::lock_trio(self, changes, other);
        b.values.iter().any(|(k, v)| {
            let conflicting = a.values.get(k).is_some_and(|mine| mine != v);
            conflicting && c.values.get(k) != Some(v)
        })
    }

    /// Counts every key of `self` whose value differs from, or is absent in,
    /// `other`; differing entries are optionally written into `out`.
    ///
    /// `stop_at` bounds the count for early exit (pass [`NO_STOP`] for a full
    /// diff) and `predicate` filters which facts participate. `out` must be a
    /// thread-private state (a fresh pool hand-out) distinct from both
    /// operands; an aliased `out` panics. The output is appended to, never
    /// cleared.
    pub fn missing_difference(
        &self,
        other: &Self,
        out: Option<&Self>,
        stop_at: usize,
        predicate: Option<&FactPredicate<K, V>>,
    ) -> usize {
        if std::ptr::eq(self, other) {
            return 0;
        }
        let (a, b) = Self::lock_pair(self, other);
        let mut out_guard = out.map(|o| {
            // Locking an aliased output would self-deadlock, so the contract
            // violation must panic even in release builds.
            assert!(
                !std::ptr::eq(o, self) && !std::ptr::eq(o, other),
                "diff output must not alias an operand"
            );
            o.lock()
        });
        let mut count = 0;
        for (k, v) in a.values.iter() {
            if predicate.is_some_and(|p| !p(k, v)) {
                continue;
            }
            let differs = b.values.get(k).is_none_or(|theirs| theirs != v);
            if differs {
                count += 1;
                if let Some(o) = out_guard.as_mut() {
                    o.values.insert(k.clone(), v.clone());
                }
                if count >= stop_at {
                    break;
                }
            }
        }
        count
    }

    /// Destructively narrows `self` to exactly the entries that still differ
    /// from `other`, using the spare buffer so no allocation happens.
    ///
    /// Returns the number of entries kept. Entries rejected by `predicate`
    /// are dropped along with the satisfied ones.
    pub fn replace_with_missing_difference(
        &self,
        other: &Self,
        stop_at: usize,
        predicate: Option<&FactPredicate<K, V>>,
    ) -> usize {
        if std::ptr::eq(self, other) {
            self.clear();
            return 0;
        }
        let (mut a, b) = Self::lock_pair(self, other);
        let Buffers { values, scratch } = &mut *a;
        scratch.clear();
        let mut count = 0;
        for (k, v) in values.drain() {
            if predicate.is_some_and(|p| !p(&k, &v)) {
                continue;
            }
            let differs = b.values.get(&k).is_none_or(|theirs| *theirs != v);
            if differs {
                scratch.insert(k, v);
                count += 1;
                if count >= stop_at {
                    break;
                }
            }
        }
        std::mem::swap(values, scratch);
        scratch.clear();
        count
    }
}

impl<K, V> State<K, V>
where
    K: FactKey,
    V: FactValue + Hash,
{
    /// Order-independent content hash, used to key the search engine's
    /// de-duplication maps. Two states with equal entries hash equally.
    pub fn fingerprint(&self) -> u64 {
        let guard = self.lock();
        let mut acc = 0u64;
        for (k, v) in guard.values.iter() {
            let mut hasher = DefaultHasher::new();
            k.hash(&mut hasher);
            v.hash(&mut hasher);
            acc ^= hasher.finish();
        }
        acc
    }
}

impl<K, V> Default for State<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for State<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn clone(&self) -> Self {
        let guard = self.lock();
        Self {
            inner: Mutex::new(Buffers {
                values: guard.values.clone(),
                scratch: HashMap::new(),
            }),
        }
    }
}

impl<K, V> PartialEq for State<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        let (a, b) = Self::lock_pair(self, other);
        a.values == b.values
    }
}

impl<K, V> Eq for State<K, V>
where
    K: FactKey,
    V: FactValue,
{
}

impl<K, V> std::fmt::Debug for State<K, V>
where
    K: FactKey + std::fmt::Debug,
    V: FactValue + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let guard = self.lock();
        f.debug_map().entries(guard.values.iter()).finish()
    }
}

impl<K, V> FromIterator<(K, V)> for State<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let state = Self::new();
        {
            let mut guard = state.lock();
            guard.values.extend(iter);
        }
        state
    }
}

#[cfg(feature = "serde")]
impl<K, V> serde::Serialize for State<K, V>
where
    K: FactKey + serde::Serialize,
    V: FactValue + serde::Serialize,
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let guard = self.lock();
        serializer.collect_map(guard.values.iter())
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for State<K, V>
where
    K: FactKey + serde::Deserialize<'de>,
    V: FactValue + serde::Deserialize<'de>,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let values = HashMap::<K, V>::deserialize(deserializer)?;
        Ok(Self {
            inner: Mutex::new(Buffers {
                values,
                scratch: HashMap::new(),
            }),
        })
    }
}

/// Cloneable handle over a shared free-list of recycled states.
///
/// Planning instantiates and discards states on every expansion; the pool
/// keeps those allocations out of the hot path. The free-list is internally
/// synchronized, so one pool can serve nodes built on a planning thread and
/// domain code on another.
pub struct StatePool<K, V> {
    free: Arc<Mutex<Vec<StateRef<K, V>>>>,
}

impl<K, V> Clone for StatePool<K, V> {
    fn clone(&self) -> Self {
        Self {
            free: Arc::clone(&self.free),
        }
    }
}

impl<K, V> Default for StatePool<K, V>
where
    K: FactKey,
    V: FactValue,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> StatePool<K, V>
where
    K: FactKey,
    V: FactValue,
{
    pub fn new() -> Self {
        Self {
            free: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn free_list(&self) -> MutexGuard<'_, Vec<StateRef<K, V>>> {
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pulls a state from the free-list, or allocates one if it is empty.
    /// The state is cleared before hand-out and optionally seeded with a
    /// copy of `seed`'s entries.
    pub fn instantiate(&self, seed: Option<&State<K, V>>) -> StateRef<K, V> {
        let reused = self.free_list().pop();
        let state = reused.unwrap_or_else(|| Arc::new(State::new()));
        state.clear();
        if let Some(seed) = seed {
            state.merge_from(seed);
        }
        state
    }

    /// Returns a state to the free-list once no node references it.
    ///
    /// A handle that is still shared is dropped instead of pooled, so a
    /// reused state can never expose buffers another owner still reads.
    pub fn recycle(&self, state: StateRef<K, V>) {
        if Arc::strong_count(&state) == 1 {
            state.clear();
            self.free_list().push(state);
        }
    }

    /// Pre-populates the free-list to `n` entries, avoiding first-use
    /// allocation spikes on the planning thread.
    pub fn warmup(&self, n: usize) {
        let mut free = self.free_list();
        while free.len() < n {
            free.push(Arc::new(State::new()));
        }
    }

    /// Number of states currently waiting in the free-list.
    pub fn available(&self) -> usize {
        self.free_list().len()
    }
}
