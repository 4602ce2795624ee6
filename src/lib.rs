pub mod choices;
pub mod combinatorics;
pub mod config;
pub mod distribution;
pub mod engine;
pub mod game;
pub mod scoring;
pub mod types;

use std::hash::Hash;
use std::marker::PhantomData;

use rustc_hash::FxHashMap;

use combinatorics::DISTINCT_HAND_COUNT;
use types::{DiceCounts, DiceState, Hand, RerollsLeft};

pub use choices::{Action, choices};
pub use config::EngineConfig;
pub use distribution::{RollDistribution, distribution};
pub use engine::{Engine, EngineError, Value, Widget, dice_dp};
pub use game::MoveError;

/// Allows the DP to run against different memo implementations.
pub trait Memo<K, V> {
    /// Returns &memo[key] if it exists.
    fn get(&self, key: &K) -> Option<&V>;
    /// Sets memo[key] = value, returning whatever was previously there.
    fn set(&mut self, key: K, value: V) -> Option<V>;
    /// Number of keys with a value.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Allows any key to be used with a VecMemo as long as some to_index and max_index are
/// implemented.
pub trait IndexKey {
    fn to_index(&self) -> usize;
    fn max_index() -> usize;
}

#[derive(Debug, Clone)]
pub struct MapMemo<K, V> {
    memo: FxHashMap<K, V>,
}

#[derive(Debug, Clone)]
pub struct VecMemo<K, V> {
    memo: Vec<Option<V>>,
    _phantom: PhantomData<K>,
}

impl<K: Eq + Hash, V> Memo<K, V> for MapMemo<K, V> {
    fn get(&self, key: &K) -> Option<&V> {
        self.memo.get(key)
    }

    fn set(&mut self, key: K, value: V) -> Option<V> {
        self.memo.insert(key, value)
    }

    fn len(&self) -> usize {
        self.memo.len()
    }
}

impl<K, V> MapMemo<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.memo.clear();
    }
}

impl<K, V> Default for MapMemo<K, V> {
    fn default() -> Self {
        Self {
            memo: FxHashMap::default(),
        }
    }
}

impl<K: IndexKey, V> Memo<K, V> for VecMemo<K, V> {
    fn get(&self, key: &K) -> Option<&V> {
        self.memo[key.to_index()].as_ref()
    }

    fn set(&mut self, key: K, value: V) -> Option<V> {
        self.memo[key.to_index()].replace(value)
    }

    fn len(&self) -> usize {
        self.memo.iter().filter(|slot| slot.is_some()).count()
    }
}

impl<K: IndexKey, V> VecMemo<K, V> {
    pub fn new() -> Self {
        let size = K::max_index() + 1;
        let mut vec = Vec::with_capacity(size);
        vec.resize_with(size, || None);
        Self {
            memo: vec,
            _phantom: PhantomData,
        }
    }

    /// Reads a slot by precomputed index, skipping the key conversion.
    pub fn raw_get(&self, index: usize) -> Option<&V> {
        self.memo.get(index).and_then(Option::as_ref)
    }
}

impl<K: IndexKey, V> Default for VecMemo<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexKey for DiceState {
    /// We use stars-and-bars to give each hand a unique number on [0..252], and then consider
    /// rerolls_left which is on [0..3].
    fn to_index(&self) -> usize {
        dice_state_index(self.hand.rank(), self.rerolls_left.get())
    }

    fn max_index() -> usize {
        DISTINCT_HAND_COUNT * (RerollsLeft::MAX as usize + 1) - 1
    }
}

/// Same layout as `DiceState::to_index`, for callers that already hold a rank.
pub(crate) fn dice_state_index(rank: usize, rerolls_left: u8) -> usize {
    rank * (RerollsLeft::MAX as usize + 1) + rerolls_left as usize
}

impl IndexKey for DiceCounts {
    /// Counts read as base-6 digits. These indices are very sparsely distributed, so this
    /// should be used with caution.
    fn to_index(&self) -> usize {
        let mut index = 0usize;
        for &c in self.counts() {
            index *= Hand::NUM_DICE + 1;
            index += c as usize;
        }
        index
    }

    fn max_index() -> usize {
        (Hand::NUM_DICE + 1).pow(Hand::NUM_FACES as u32) - 1
    }
}
