//! `VnodeStore` impl for [`VfsInner`] — the seam `vnode_vfs::VnodeOps`
//! implementations use to read/mutate the pool that owns them (see the
//! module doc comment on `vnode_vfs::ops` for why this indirection exists).

use alloc::string::String;
use alloc::vec::Vec;

use vnode_errno::VfsResult;
use vnode_vfs::{IAttr, VnodeAttr, VnodeId, VnodeKind, VnodeStore, S_IFMT};

use crate::pool::VfsInner;

impl VnodeStore for VfsInner {
    fn attr(&self, id: VnodeId) -> Option<VnodeAttr> {
        self.slot(id).ok().map(|s| VnodeAttr {
            mode: s.mode,
            uid: s.uid,
            gid: s.gid,
        })
    }

    fn kind(&self, id: VnodeId) -> Option<VnodeKind> {
        self.slot(id).ok().map(|s| s.kind)
    }

    fn set_attr(&mut self, id: VnodeId, iattr: &IAttr) {
        let Ok(slot) = self.slot_mut(id) else {
            return;
        };
        if let Some(mode) = iattr.mode {
            slot.mode = (slot.mode & S_IFMT) | (mode & !S_IFMT);
        }
        if let Some(uid) = iattr.uid {
            slot.uid = uid;
        }
        if let Some(gid) = iattr.gid {
            slot.gid = gid;
        }
    }

    fn create_child(
        &mut self,
        parent: VnodeId,
        name: &str,
        kind: VnodeKind,
        mode: u32,
    ) -> VfsResult<VnodeId> {
        let parent_slot = self.slot(parent)?;
        let ops = parent_slot.ops.clone();
        let uid = parent_slot.uid;
        let gid = parent_slot.gid;
        let origin_mount = parent_slot.origin_mount;

        let child = self.alloc(Some(ops))?;
        let slot = self.slot_mut(child).expect("just allocated");
        slot.kind = kind;
        slot.mode = mode;
        slot.uid = uid;
        slot.gid = gid;
        slot.origin_mount = origin_mount;
        slot.parent = Some(parent);

        self.path_cache.insert(parent, child, name);
        Ok(child)
    }

    fn cached_children(&self, id: VnodeId, start_idx: usize) -> Vec<(String, VnodeId)> {
        self.path_cache.children_from(id, start_idx)
    }
}
