use std::hash::Hash;

use indexmap::IndexMap;

/// Per-member bookkeeping of who finished the current round.
///
/// The table remembers which round it describes; [`sync_round`](Self::sync_round)
/// clears it when a newer round has started, which is equivalent to clearing it
/// at the start of that round.
#[derive(Debug)]
pub(crate) struct ReadinessTable<K> {
    round: u64,
    completed: bool,
    slots: IndexMap<K, bool>,
}

impl<K: Hash + Eq + Clone> ReadinessTable<K> {
    pub(crate) fn new<'a>(keys: impl IntoIterator<Item = &'a K>) -> Self
    where
        K: 'a,
    {
        Self {
            round: 0,
            completed: false,
            slots: keys.into_iter().map(|key| (key.clone(), false)).collect(),
        }
    }

    pub(crate) fn sync_round(&mut self, round: u64) {
        if self.round == round {
            return;
        }
        self.round = round;
        self.completed = false;
        self.slots.values_mut().for_each(|ready| *ready = false);
    }

    pub(crate) fn mark_ready(&mut self, key: &K) {
        if let Some(ready) = self.slots.get_mut(key) {
            *ready = true;
        }
    }

    pub(crate) fn all_ready(&self) -> bool {
        self.slots.values().all(|ready| *ready)
    }

    pub(crate) fn is_completed(&self) -> bool {
        self.completed
    }

    pub(crate) fn complete(&mut self) {
        self.completed = true;
    }
}
