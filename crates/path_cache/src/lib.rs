//! A minimal `(parent, name) -> child` memo, standing in for the real
//! path-name cache spec §1/§6 explicitly place out of scope ("a separate
//! hash of `(parent, name) -> child`", owned by a different subsystem).
//!
//! The walker (`ruxvnode::walk`) cannot take a single step without
//! consulting this contract, and nothing in the retrieval pack implements
//! it, so this crate implements *only* the contract spec §6 lists —
//! `lookup`, `alloc`, `free` — plus the per-parent ordered child list
//! `Readdir` needs (spec §4.F), and nothing else: no LRU of its own, no
//! hashing tricks, no generic key type beyond what the walker needs.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// A `(parent, name) -> child` cache keyed by an arbitrary `Ord + Copy`
/// vnode identity (in practice `vnode_vfs::VnodeId`, but this crate does
/// not depend on `vnode_vfs` — it owns no vnode semantics, just the name
/// index).
pub struct PathCache<K: Ord + Copy> {
    /// `parent -> (name -> child)`, used for point lookups.
    by_parent: BTreeMap<K, BTreeMap<String, K>>,
    /// `parent -> [(name, child)]` in insertion order, used for `Readdir`.
    children: BTreeMap<K, Vec<(String, K)>>,
    /// `child -> [parent]`, the reverse index needed to flush every entry
    /// referencing a vnode when it is freed (spec §4.A: "Evicts the vnode
    /// from the path cache (flushes both parent and child path-cache
    /// entries referencing it)").
    parents_of: BTreeMap<K, Vec<K>>,
}

impl<K: Ord + Copy> Default for PathCache<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ord + Copy> PathCache<K> {
    /// An empty cache.
    pub fn new() -> Self {
        Self {
            by_parent: BTreeMap::new(),
            children: BTreeMap::new(),
            parents_of: BTreeMap::new(),
        }
    }

    /// `lookup(parent, name) -> child | Miss` (spec §6).
    pub fn lookup(&self, parent: K, name: &str) -> Option<K> {
        self.by_parent.get(&parent)?.get(name).copied()
    }

    /// `alloc(parent, child, name, len)` (spec §6): memoize a resolved
    /// step. Overwrites any prior entry for the same `(parent, name)`.
    pub fn insert(&mut self, parent: K, child: K, name: &str) {
        self.by_parent
            .entry(parent)
            .or_default()
            .insert(String::from(name), child);
        let list = self.children.entry(parent).or_default();
        if let Some(slot) = list.iter_mut().find(|(n, _)| n == name) {
            slot.1 = child;
        } else {
            list.push((String::from(name), child));
        }
        let back = self.parents_of.entry(child).or_default();
        if !back.contains(&parent) {
            back.push(parent);
        }
    }

    /// `free(entry)` generalized to "flush every entry touching `id`"
    /// (spec §6/§4.A): removes `id` from every parent's child list it
    /// appears in, and drops `id`'s own child list and lookup table should
    /// it itself be a parent.
    pub fn evict(&mut self, id: K) {
        if let Some(parents) = self.parents_of.remove(&id) {
            for parent in parents {
                if let Some(map) = self.by_parent.get_mut(&parent) {
                    map.retain(|_, v| *v != id);
                }
                if let Some(list) = self.children.get_mut(&parent) {
                    list.retain(|(_, c)| *c != id);
                }
            }
        }
        self.by_parent.remove(&id);
        if let Some(kids) = self.children.remove(&id) {
            for (_, child) in kids {
                if let Some(parents) = self.parents_of.get_mut(&child) {
                    parents.retain(|p| *p != id);
                }
            }
        }
    }

    /// Remove a single `(parent, name)` entry, as opposed to [`Self::evict`]
    /// which flushes every entry touching an id. Needed by `change_root`
    /// (spec §4.E), which frees only the old root's `"dev"`/`"proc"` entry
    /// and leaves the rest of the cache — including the renamed vnode's
    /// other entries, if any — untouched. Returns the child that was
    /// mapped, if the entry existed.
    pub fn remove_entry(&mut self, parent: K, name: &str) -> Option<K> {
        let child = self.by_parent.get_mut(&parent)?.remove(name)?;
        if let Some(list) = self.children.get_mut(&parent) {
            list.retain(|(n, _)| n != name);
        }
        let still_referenced = self
            .by_parent
            .get(&parent)
            .is_some_and(|m| m.values().any(|c| *c == child));
        if !still_referenced {
            if let Some(parents) = self.parents_of.get_mut(&child) {
                parents.retain(|p| *p != parent);
            }
        }
        Some(child)
    }

    /// Children of `parent` memoized so far, in insertion order, starting
    /// at `start_idx` (spec §4.F's `fd_position` cursor).
    pub fn children_from(&self, parent: K, start_idx: usize) -> Vec<(String, K)> {
        self.children
            .get(&parent)
            .map(|list| list.iter().skip(start_idx).cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of children memoized for `parent`, for bounds checks.
    pub fn child_count(&self, parent: K) -> usize {
        self.children.get(&parent).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup_hits() {
        let mut c = PathCache::new();
        c.insert(1u32, 2u32, "a");
        assert_eq!(c.lookup(1, "a"), Some(2));
        assert_eq!(c.lookup(1, "b"), None);
    }

    #[test]
    fn evict_as_child_removes_from_parent() {
        let mut c = PathCache::new();
        c.insert(1u32, 2u32, "a");
        c.evict(2);
        assert_eq!(c.lookup(1, "a"), None);
        assert_eq!(c.children_from(1, 0), Vec::new());
    }

    #[test]
    fn evict_as_parent_drops_own_children() {
        let mut c = PathCache::new();
        c.insert(1u32, 2u32, "a");
        c.insert(1u32, 3u32, "b");
        c.evict(1);
        assert_eq!(c.children_from(1, 0), Vec::new());
        // reverse index for the (now orphaned) children is cleaned up too.
        c.insert(4u32, 2u32, "a-again");
        assert_eq!(c.lookup(4, "a-again"), Some(2));
    }

    #[test]
    fn remove_entry_drops_only_that_mapping() {
        let mut c = PathCache::new();
        c.insert(1u32, 2u32, "dev");
        c.insert(1u32, 3u32, "proc");
        assert_eq!(c.remove_entry(1, "dev"), Some(2));
        assert_eq!(c.lookup(1, "dev"), None);
        assert_eq!(c.lookup(1, "proc"), Some(3));
        assert_eq!(c.children_from(1, 0), alloc::vec![(String::from("proc"), 3)]);
    }

    #[test]
    fn children_preserve_insertion_order() {
        let mut c = PathCache::new();
        c.insert(1u32, 10u32, "z");
        c.insert(1u32, 11u32, "a");
        let kids = c.children_from(1, 0);
        assert_eq!(kids, alloc::vec![(String::from("z"), 10), (String::from("a"), 11)]);
    }
}
