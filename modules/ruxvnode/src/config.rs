//! `Vfs` construction-time configuration.
//!
//! Spec §9's design notes call for tests to "instantiate an isolated
//! context per case" rather than saturate the real `MAX_VNODE_SIZE`
//! ceiling; this config is how a test picks a pool of size 8 while
//! production wiring keeps the ABI-mandated defaults from spec §6.

use crate::defaults;

/// Tunable knobs for a [`crate::Vfs`] instance.
#[derive(Debug, Clone, Copy)]
pub struct VfsConfig {
    /// Hard ceiling on physically allocated vnodes (`MAX_VNODE_SIZE`).
    pub max_vnodes: usize,
    /// Upper bound on vnodes freed per `reclaim_lru` call (`LRU_BATCH`).
    pub lru_batch: usize,
    /// Mode bits given to a freshly synthesized `/dev` directory.
    pub dev_vnode_mode: u32,
}

impl Default for VfsConfig {
    fn default() -> Self {
        Self {
            max_vnodes: defaults::MAX_VNODE_SIZE,
            lru_batch: defaults::LRU_BATCH,
            dev_vnode_mode: defaults::DEV_VNODE_MODE,
        }
    }
}

impl VfsConfig {
    /// A tiny pool, for tests exercising saturation/reclamation without
    /// paying for thousands of allocations (spec §8's boundary-behavior
    /// tests).
    pub fn small(max_vnodes: usize) -> Self {
        Self {
            max_vnodes,
            ..Default::default()
        }
    }
}
