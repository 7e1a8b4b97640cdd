use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use crate::settings::StrayEventPolicy;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, PartialEq)]
struct Entry {
    task: Task,
    seq: u64,
    confirmed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced,
    /// Push event for a removed id, dropped by [`StrayEventPolicy::Suppress`].
    Suppressed,
}

/// Bounded FIFO memory of removed ids.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Tombstones {
    order: VecDeque<TaskId>,
    ids: HashSet<TaskId>,
    capacity: usize,
}

impl Tombstones {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            ids: HashSet::new(),
            capacity,
        }
    }

    fn insert(&mut self, id: TaskId) {
        if self.capacity == 0 || !self.ids.insert(id.clone()) {
            return;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
    }

    fn remove(&mut self, id: &str) {
        if self.ids.remove(id) {
            self.order.retain(|kept| kept != id);
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }
}

/// Keyed store of tasks with a stable newest-first order.
///
/// Order follows the sequence number an id received when it was first seen;
/// replacing a record keeps its position. The registry never evicts entries.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRegistry {
    entries: HashMap<TaskId, Entry>,
    order: BTreeMap<u64, TaskId>,
    next_seq: u64,
    tombstones: Tombstones,
    policy: StrayEventPolicy,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(StrayEventPolicy::default(), 256)
    }
}

impl TaskRegistry {
    pub fn new(policy: StrayEventPolicy, tombstone_capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            tombstones: Tombstones::with_capacity(tombstone_capacity),
            policy,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.entries.get(id).map(|entry| &entry.task)
    }

    /// `Some(false)` while the latest write to `id` was a local, unconfirmed one.
    pub fn is_confirmed(&self, id: &str) -> Option<bool> {
        self.entries.get(id).map(|entry| entry.confirmed)
    }

    pub fn is_tombstoned(&self, id: &str) -> bool {
        self.tombstones.contains(id)
    }

    /// Local write: inserts or wholesale-replaces the record, marked unconfirmed.
    pub fn upsert(&mut self, task: Task) -> UpsertOutcome {
        self.tombstones.remove(&task.id);
        self.write(task, false)
    }

    /// Authoritative write from the worker, subject to the stray-event policy.
    pub fn reconcile(&mut self, task: Task) -> UpsertOutcome {
        if !self.entries.contains_key(&task.id) && self.tombstones.contains(&task.id) {
            match self.policy {
                StrayEventPolicy::Suppress => return UpsertOutcome::Suppressed,
                StrayEventPolicy::Resurrect => self.tombstones.remove(&task.id),
            }
        }
        self.write(task, true)
    }

    fn write(&mut self, task: Task, confirmed: bool) -> UpsertOutcome {
        match self.entries.get_mut(&task.id) {
            Some(entry) => {
                entry.task = task;
                entry.confirmed = confirmed;
                UpsertOutcome::Replaced
            }
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.order.insert(seq, task.id.clone());
                self.entries.insert(
                    task.id.clone(),
                    Entry {
                        task,
                        seq,
                        confirmed,
                    },
                );
                UpsertOutcome::Inserted
            }
        }
    }

    /// Field-preserving local edit. Returns false if `id` is unknown.
    pub fn patch(&mut self, id: &str, edit: impl FnOnce(&mut Task)) -> bool {
        match self.entries.get_mut(id) {
            Some(entry) => {
                edit(&mut entry.task);
                entry.confirmed = false;
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, id: &str) -> Option<Task> {
        let entry = self.entries.remove(id)?;
        self.order.remove(&entry.seq);
        self.tombstones.insert(entry.task.id.clone());
        Some(entry.task)
    }

    /// Removes every task matching `predicate`, returning the removed ids newest first.
    pub fn delete_where(&mut self, mut predicate: impl FnMut(&Task) -> bool) -> Vec<TaskId> {
        let doomed: Vec<TaskId> = self
            .iter()
            .filter(|task| predicate(task))
            .map(|task| task.id.clone())
            .collect();
        for id in &doomed {
            self.delete(id);
        }
        doomed
    }

    /// Tasks newest first.
    pub fn iter(&self) -> impl Iterator<Item = &Task> + '_ {
        self.order
            .values()
            .rev()
            .filter_map(|id| self.entries.get(id).map(|entry| &entry.task))
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.iter().cloned().collect()
    }

    /// `(task, confirmed)` pairs newest first.
    pub fn entries(&self) -> impl Iterator<Item = (&Task, bool)> + '_ {
        self.order
            .values()
            .rev()
            .filter_map(|id| self.entries.get(id).map(|entry| (&entry.task, entry.confirmed)))
    }
}
