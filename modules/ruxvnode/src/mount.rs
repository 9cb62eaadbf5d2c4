//! Mount records (spec §6: "opaque `Mount` record exposing `vnode_covered`
//! ... and `vnode_be_covered`").
//!
//! Creating, binding and unbinding backing storage for a mount is the mount
//! table's job and explicitly out of scope (spec §1). This module keeps
//! only the shape spec §6 requires so the root/mount hooks (spec §4.E) and
//! the mount-crossing step of the walker (spec §4.C step 5) have something
//! concrete to read. There is no `unmount`: hot-unmount-while-in-use is a
//! Non-goal (spec §1), and the distilled spec never asks for mount record
//! removal, only for `free_all`/`in_use` to observe an existing one.

use alloc::vec::Vec;

use vnode_vfs::{MountId, VnodeId};

/// One mount: the root of the mounted filesystem (`vnode_covered`) and the
/// directory in the covering filesystem it hides (`vnode_be_covered`).
/// Invariant 7 (spec §3): `vnode_covered` carries `MOUNT_NEW`,
/// `vnode_be_covered` carries `MOUNT_ORIGIN` and its `new_mount` points back
/// at this record.
#[derive(Debug, Clone, Copy)]
pub struct Mount {
    pub vnode_covered: VnodeId,
    pub vnode_be_covered: VnodeId,
}

/// Append-only table of mount records, indexed by [`MountId`].
#[derive(Default)]
pub(crate) struct MountTable {
    mounts: Vec<Mount>,
}

impl MountTable {
    pub fn new() -> Self {
        Self { mounts: Vec::new() }
    }

    pub fn alloc(&mut self, vnode_covered: VnodeId, vnode_be_covered: VnodeId) -> MountId {
        let id = MountId::from_raw(self.mounts.len() as u32);
        self.mounts.push(Mount {
            vnode_covered,
            vnode_be_covered,
        });
        id
    }

    pub fn get(&self, id: MountId) -> Option<&Mount> {
        self.mounts.get(id.raw() as usize)
    }

    pub fn set_vnode_be_covered(&mut self, id: MountId, vnode_be_covered: VnodeId) {
        if let Some(m) = self.mounts.get_mut(id.raw() as usize) {
            m.vnode_be_covered = vnode_be_covered;
        }
    }
}
