//! The vnode pool (spec §4.A) and the three intrusive lists it threads
//! vnodes through (spec §4.B, Invariant 1).
//!
//! `free_list` and `virtual_list` are plain `Vec<VnodeId>`: membership is all
//! that matters for them, not order (spec §9 explicitly allows "three
//! independent containers keyed by stable vnode identity" in place of one
//! shared link field). The active list *is* order-sensitive (Invariant 6),
//! so it alone is threaded through `VnodeSlot::list_prev`/`list_next`.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::mem::size_of;

use log::{debug, error, warn};
use slab::Slab;

use path_cache::PathCache;
use vnode_errno::{vnode_err, VfsResult};
use vnode_vfs::{MountId, PermissionPolicy, VnodeFlags, VnodeId, VnodeOps};

use crate::config::VfsConfig;
use crate::mount::MountTable;
use crate::vnode::{VnodeSlot, VnodeState};

/// All mutable state guarded by the single `vnode_mux` (spec §5): the slab
/// of physically allocated vnodes, the three lists, the mount table, the
/// path-name cache, and the current root.
pub(crate) struct VfsInner {
    slots: Slab<VnodeSlot>,
    generations: Vec<u32>,
    free_list: Vec<VnodeId>,
    virtual_list: Vec<VnodeId>,
    active_head: Option<VnodeId>,
    active_tail: Option<VnodeId>,
    pub(crate) mounts: MountTable,
    pub(crate) path_cache: PathCache<VnodeId>,
    pub(crate) root: Option<VnodeId>,
    pub(crate) devfs_ops: Arc<dyn VnodeOps>,
    pub(crate) permission: Arc<dyn PermissionPolicy>,
    config: VfsConfig,
}

impl VfsInner {
    pub fn new(
        config: VfsConfig,
        devfs_ops: Arc<dyn VnodeOps>,
        permission: Arc<dyn PermissionPolicy>,
    ) -> Self {
        Self {
            slots: Slab::with_capacity(config.max_vnodes.min(64)),
            generations: Vec::new(),
            free_list: Vec::new(),
            virtual_list: Vec::new(),
            active_head: None,
            active_tail: None,
            mounts: MountTable::new(),
            path_cache: PathCache::new(),
            root: None,
            devfs_ops,
            permission,
            config,
        }
    }

    pub fn config(&self) -> VfsConfig {
        self.config
    }

    /// Count of physically allocated slots, `total_size` in spec §3.
    /// Recycled (free-listed) slots are still physically allocated, so this
    /// is `self.slots.len()`, not `self.slots.len() - free_list.len()`.
    pub fn total_size(&self) -> usize {
        self.slots.len()
    }

    pub fn free_size(&self) -> usize {
        self.free_list.len()
    }

    // ---- identity validation -------------------------------------------

    fn index_of(&self, id: VnodeId) -> VfsResult<usize> {
        let idx = id.slot() as usize;
        if self.generations.get(idx).copied() == Some(id.generation()) && self.slots.contains(idx)
        {
            Ok(idx)
        } else {
            vnode_err!(Invalid, "stale or unknown vnode id")
        }
    }

    pub fn slot(&self, id: VnodeId) -> VfsResult<&VnodeSlot> {
        let idx = self.index_of(id)?;
        Ok(self.slots.get(idx).expect("validated by index_of"))
    }

    pub fn slot_mut(&mut self, id: VnodeId) -> VfsResult<&mut VnodeSlot> {
        let idx = self.index_of(id)?;
        Ok(self.slots.get_mut(idx).expect("validated by index_of"))
    }

    // ---- pinning (exposed as `Vfs::hold`/`Vfs::release`) ----------------

    pub fn hold(&mut self, id: VnodeId) -> VfsResult<()> {
        self.slot_mut(id)?.use_count += 1;
        Ok(())
    }

    pub fn release(&mut self, id: VnodeId) -> VfsResult<()> {
        let slot = self.slot_mut(id)?;
        if slot.use_count == 0 {
            return vnode_err!(Invalid, "release of an unpinned vnode");
        }
        slot.use_count -= 1;
        Ok(())
    }

    // ---- active-list (LRU) links -----------------------------------------

    fn unlink_active(&mut self, id: VnodeId) {
        let (prev, next) = match self.slots.get(id.slot() as usize) {
            Some(s) => (s.list_prev, s.list_next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(s) = self.slots.get_mut(p.slot() as usize) {
                    s.list_next = next;
                }
            }
            None => self.active_head = next,
        }
        match next {
            Some(n) => {
                if let Some(s) = self.slots.get_mut(n.slot() as usize) {
                    s.list_prev = prev;
                }
            }
            None => self.active_tail = prev,
        }
        if let Some(s) = self.slots.get_mut(id.slot() as usize) {
            s.list_prev = None;
            s.list_next = None;
        }
    }

    /// Enroll at the tail (most recently used end, Invariant 6).
    fn push_tail_active(&mut self, id: VnodeId) {
        let old_tail = self.active_tail;
        if let Some(s) = self.slots.get_mut(id.slot() as usize) {
            s.list_prev = old_tail;
            s.list_next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(s) = self.slots.get_mut(t.slot() as usize) {
                    s.list_next = Some(id);
                }
            }
            None => self.active_head = Some(id),
        }
        self.active_tail = Some(id);
    }

    /// Move-to-tail on touch (spec §4.C step 6, "LRU refresh").
    pub fn touch_active(&mut self, id: VnodeId) {
        self.unlink_active(id);
        self.push_tail_active(id);
    }

    // ---- allocation / free (spec §4.A) -----------------------------------

    /// `alloc(ops_opt)`. `None` enrolls on the virtual list bound to
    /// `devfs_ops`; `Some(ops)` enrolls at the tail of the active list.
    pub fn alloc(&mut self, ops: Option<Arc<dyn VnodeOps>>) -> VfsResult<VnodeId> {
        let id = if let Some(id) = self.free_list.pop() {
            id
        } else if self.slots.len() < self.config.max_vnodes {
            let synthetic = ops.is_none();
            let slot = VnodeSlot::new(
                ops.clone().unwrap_or_else(|| self.devfs_ops.clone()),
                if synthetic {
                    VnodeState::Virtual
                } else {
                    VnodeState::Active
                },
            );
            let idx = self.slots.insert(slot);
            while self.generations.len() <= idx {
                self.generations.push(0);
            }
            VnodeId::from_raw(idx as u32, self.generations[idx])
        } else if self.reclaim_lru().is_some() {
            match self.free_list.pop() {
                Some(id) => id,
                None => {
                    error!("vnode pool exhausted: reclaim produced no free slot");
                    return vnode_err!(NoMemory);
                }
            }
        } else {
            error!("vnode pool exhausted: alloc/free-list/reclaim all failed");
            return vnode_err!(NoMemory);
        };

        match ops {
            None => {
                let slot = self.slots.get_mut(id.slot() as usize).expect("just allocated");
                slot.ops = self.devfs_ops.clone();
                slot.state = VnodeState::Virtual;
                self.virtual_list.push(id);
            }
            Some(ops) => {
                let slot = self.slots.get_mut(id.slot() as usize).expect("just allocated");
                slot.ops = ops;
                slot.state = VnodeState::Active;
                self.push_tail_active(id);
            }
        }
        Ok(id)
    }

    /// `free(vnode)`. `Busy` if pinned; otherwise evicts path-cache and
    /// list links, invokes `Reclaim`, and either physically deallocates
    /// (synthetic) or wipes and recycles the slot onto the free list
    /// (non-synthetic).
    pub fn free(&mut self, id: VnodeId) -> VfsResult<()> {
        let idx = self.index_of(id)?;
        let use_count = self.slots[idx].use_count;
        if use_count > 0 {
            warn!("free() of vnode {:?} rejected: use_count={}", id, use_count);
            return vnode_err!(Busy);
        }

        self.path_cache.evict(id);

        let synthetic = self.slots[idx].is_synthetic(&self.devfs_ops);
        let state = self.slots[idx].state;
        let ops = self.slots[idx].ops.clone();

        // Path-cache and list links are dropped before `Reclaim` runs, so a
        // driver's `Reclaim` never observes a vnode still reachable from
        // the cache or the registry (`VnodeFree` in
        // `original_source/fs/vfs/vnode.c` unlinks before dispatching).
        match state {
            VnodeState::Active => self.unlink_active(id),
            VnodeState::Virtual => self.virtual_list.retain(|v| *v != id),
            VnodeState::Free => {}
        }

        // `Reclaim`'s result is not propagated: `VnodeFree` calls
        // `vnode->vop->Reclaim(vnode)` directly with no status check, and
        // this free must still complete (the slot must be recycled or
        // deallocated regardless) to keep `total_size`/`free_size`
        // accurate for every caller, including `reclaim_lru`'s batch count.
        let _ = ops.reclaim(self, id);
        self.slots.get_mut(idx).expect("validated").file_path = None;

        self.generations[idx] = self.generations[idx].wrapping_add(1);
        if synthetic {
            self.slots.remove(idx);
        } else {
            let fresh = VnodeSlot::new(self.devfs_ops.clone(), VnodeState::Free);
            *self.slots.get_mut(idx).expect("validated") = fresh;
            let recycled = VnodeId::from_raw(idx as u32, self.generations[idx]);
            self.free_list.push(recycled);
        }
        Ok(())
    }

    /// `reclaim_lru()`. Single pass over the active list from the head
    /// (least recently used), skipping pinned/mount-flagged vnodes without
    /// counting them, freeing up to `LRU_BATCH` eligible ones.
    pub fn reclaim_lru(&mut self) -> Option<VnodeId> {
        let mut reclaimed = 0usize;
        let mut cursor = self.active_head;
        while reclaimed < self.config.lru_batch {
            let Some(id) = cursor else { break };
            let next = self.slots.get(id.slot() as usize).and_then(|s| s.list_next);
            let eligible = self
                .slots
                .get(id.slot() as usize)
                .map(|s| s.is_reclaimable())
                .unwrap_or(false);
            if eligible {
                // `free` cannot fail here: eligibility already implies
                // `use_count == 0`, and `free` no longer aborts partway
                // through on a driver `Reclaim` error (its result is
                // ignored, matching the original `VnodeFree`).
                let _ = self.free(id);
                reclaimed += 1;
            }
            cursor = next;
        }
        debug!("reclaim_lru: reclaimed {} vnode(s)", reclaimed);
        if reclaimed == 0 {
            None
        } else {
            self.free_list.last().copied()
        }
    }

    /// `free_all(mount)`. Frees every active vnode whose `origin_mount`
    /// matches `mount`, excluding the mount's own `MOUNT_NEW` root. Aborts
    /// (without rolling back prior frees) on the first `Busy`.
    pub fn free_all(&mut self, mount: MountId) -> VfsResult<()> {
        let mut cursor = self.active_head;
        while let Some(id) = cursor {
            let slot = self.slots.get(id.slot() as usize).expect("active list entry");
            let next = slot.list_next;
            let matches = slot.origin_mount == Some(mount) && !slot.flags.contains(VnodeFlags::MOUNT_NEW);
            if matches {
                self.free(id)?;
            }
            cursor = next;
        }
        Ok(())
    }

    /// `in_use(mount)`. True iff any vnode from `mount` is pinned or is the
    /// covered (`MOUNT_ORIGIN`) side of a mount. Scans the active list, not
    /// the whole slab, matching `VnodeInUseIter`'s own traversal.
    pub fn in_use(&self, mount: MountId) -> bool {
        let mut cursor = self.active_head;
        while let Some(id) = cursor {
            let Some(slot) = self.slots.get(id.slot() as usize) else {
                break;
            };
            if slot.origin_mount == Some(mount)
                && (slot.use_count > 0 || slot.flags.contains(VnodeFlags::MOUNT_ORIGIN))
            {
                return true;
            }
            cursor = slot.list_next;
        }
        false
    }

    // ---- list head introspection (spec §4.B, §6) -------------------------

    /// Snapshot of the free list. Membership only; no ordering guarantee
    /// (spec §9 permits "three independent containers keyed by stable
    /// vnode identity" in place of the original's single shared link).
    pub fn free_list(&self) -> Vec<VnodeId> {
        self.free_list.clone()
    }

    /// Snapshot of the virtual (synthetic/device) list.
    pub fn virtual_list(&self) -> Vec<VnodeId> {
        self.virtual_list.clone()
    }

    /// Snapshot of the active list, head (least recently used) first
    /// (Invariant 6).
    pub fn active_list(&self) -> Vec<VnodeId> {
        let mut out = Vec::new();
        let mut cursor = self.active_head;
        while let Some(id) = cursor {
            out.push(id);
            cursor = self.slots.get(id.slot() as usize).and_then(|s| s.list_next);
        }
        out
    }

    /// Bind a mount record and mark both sides' flags per Invariant 7:
    /// `vnode_covered` gets `MOUNT_NEW`, `vnode_be_covered` gets
    /// `MOUNT_ORIGIN` with its `new_mount` pointed at the new record.
    /// Shared by `dev_init` (where both sides name the same synthetic
    /// vnode, spec §4.E) and any other bootstrap code installing a mount
    /// point — the mount table's own bind operation is out of scope (spec
    /// §1), so this is the minimal stand-in both need.
    pub fn bind_mount(&mut self, vnode_covered: VnodeId, vnode_be_covered: VnodeId) -> VfsResult<MountId> {
        self.slot(vnode_covered)?;
        self.slot(vnode_be_covered)?;
        let mount_id = self.mounts.alloc(vnode_covered, vnode_be_covered);
        if let Ok(slot) = self.slot_mut(vnode_covered) {
            slot.new_mount = Some(mount_id);
            slot.flags.insert(VnodeFlags::MOUNT_NEW);
        }
        if let Ok(slot) = self.slot_mut(vnode_be_covered) {
            slot.new_mount = Some(mount_id);
            slot.flags.insert(VnodeFlags::MOUNT_ORIGIN);
        }
        Ok(mount_id)
    }

    // ---- admin & introspection (spec §4.G) -------------------------------

    /// `memory_dump()`: count of unpinned, non-mount vnodes on the active
    /// list, times `sizeof(VnodeSlot)`.
    pub fn memory_dump(&self) -> usize {
        let mut count = 0usize;
        let mut cursor = self.active_head;
        while let Some(id) = cursor {
            let slot = self.slots.get(id.slot() as usize).expect("active list entry");
            if slot.is_reclaimable() {
                count += 1;
            }
            cursor = slot.list_next;
        }
        count * size_of::<VnodeSlot>()
    }

    /// `clear_cache()`: same scan as `memory_dump`, but frees each eligible
    /// vnode. Returns the number freed.
    pub fn clear_cache(&mut self) -> usize {
        let mut freed = 0usize;
        let mut cursor = self.active_head;
        while let Some(id) = cursor {
            let slot = self.slots.get(id.slot() as usize).expect("active list entry");
            let next = slot.list_next;
            if slot.is_reclaimable() && self.free(id).is_ok() {
                freed += 1;
            }
            cursor = next;
        }
        freed
    }
}
