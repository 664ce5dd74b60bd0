//! Transport / registry (C7): routes RBC deliveries and ABBA votes between
//! nodes.
//!
//! Membership is fixed at construction and the map itself is then only ever
//! read, satisfying spec.md section 5's "shared resources" model. Each
//! node's own state is still only mutated while its individual mutex is
//! held, so both the single-threaded cooperative simulation and a genuine
//! one-task-per-node realization can share this same registry type.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A shared, lockable handle to a node (or anything else addressable by
/// node id).
pub type Handle<T> = Arc<Mutex<T>>;

/// Fixed-membership map from node id to node handle.
pub struct Registry<T> {
    nodes: Arc<BTreeMap<u32, Handle<T>>>,
}

impl<T> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Registry {
            nodes: Arc::clone(&self.nodes),
        }
    }
}

impl<T> Registry<T> {
    /// Builds a registry with fixed membership from `nodes`.
    pub fn new(nodes: BTreeMap<u32, Handle<T>>) -> Self {
        Registry {
            nodes: Arc::new(nodes),
        }
    }

    /// Looks up a node's handle by id.
    pub fn get(&self, id: u32) -> Option<Handle<T>> {
        self.nodes.get(&id).cloned()
    }

    /// All node ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.keys().copied()
    }

    /// All node handles, in ascending id order.
    pub fn handles(&self) -> impl Iterator<Item = &Handle<T>> {
        self.nodes.values()
    }

    /// The number of member nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry has no members.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn registry_looks_up_members_by_id() {
        let mut nodes = BTreeMap::new();
        nodes.insert(1u32, Arc::new(Mutex::new(10i32)));
        nodes.insert(2u32, Arc::new(Mutex::new(20i32)));
        let registry = Registry::new(nodes);

        assert_eq!(registry.len(), 2);
        assert_eq!(*registry.get(1).unwrap().lock().unwrap(), 10);
        assert!(registry.get(3).is_none());
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn clone_shares_the_same_underlying_members() {
        let mut nodes = BTreeMap::new();
        nodes.insert(1u32, Arc::new(Mutex::new(0i32)));
        let registry = Registry::new(nodes);
        let clone = registry.clone();
        *registry.get(1).unwrap().lock().unwrap() = 42;
        assert_eq!(*clone.get(1).unwrap().lock().unwrap(), 42);
    }
}
