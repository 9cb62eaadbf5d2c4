//! The `VnodeOps` capability trait (spec §4.D) and the directory-stream
//! types `Readdir` fills in (spec §4.F).
//!
//! `VnodeOps` plays the role `axfs_vfs::VfsNodeOps` plays in the teacher:
//! one trait, one default body per optional operation, each default
//! returning the same error a missing C function pointer would produce.
//! It differs from `axfs_vfs::VfsNodeOps` in one way the spec forces: this
//! crate's vnodes are *pooled* objects with a central, bounded-capacity
//! store (spec §4.A), not freestanding `Arc<dyn VfsNodeOps>` trait objects.
//! An ops implementation therefore never owns a vnode directly — it is
//! handed a `&mut dyn VnodeStore` seam into the pool that owns it. The pool
//! itself (`ruxvnode::pool::VfsInner`) implements `VnodeStore`; this crate
//! never depends on that concrete type, avoiding a dependency cycle.

use alloc::string::String;
use alloc::vec::Vec;

use vnode_errno::{vnode_err, VfsError, VfsResult};

use crate::attr::{IAttr, VnodeAttr};
use crate::id::VnodeId;
use crate::kind::VnodeKind;
use crate::path::RelPath;

/// Maximum directory-entry name length a [`DirStream`] will accept before
/// failing a fill with [`VfsError::NameTooLong`] (spec §4.F).
pub const MAX_NAME_LEN: usize = 255;

/// One filled directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsDirEntry {
    /// Child name.
    pub name: String,
    /// The child's position in its parent's child list at the time it was
    /// read, used as `d_off` the way the original `VnodeReaddir` does.
    pub d_off: u64,
}

/// The caller-owned cursor + output buffer `Readdir` fills (spec §4.F).
#[derive(Debug, Default)]
pub struct DirStream {
    /// Index of the next unread child, advanced by `Readdir` on return.
    pub fd_position: u64,
    /// Upper bound on the number of entries a single `Readdir` call fills.
    pub read_cnt: usize,
    /// Entries filled by the most recent `Readdir` call.
    pub entries: Vec<VfsDirEntry>,
}

impl DirStream {
    /// A fresh stream positioned at the start of the directory.
    pub fn new(read_cnt: usize) -> Self {
        Self {
            fd_position: 0,
            read_cnt,
            entries: Vec::new(),
        }
    }
}

/// The seam between a [`VnodeOps`] implementation and the pool that owns
/// the vnode it was dispatched for. See the module doc comment for why this
/// indirection exists instead of operating on the pool type directly.
pub trait VnodeStore {
    /// Current attributes of `id`, or `None` if it no longer resolves
    /// (stale id / freed slot).
    fn attr(&self, id: VnodeId) -> Option<VnodeAttr>;

    /// Current kind of `id`, or `None` if it no longer resolves.
    fn kind(&self, id: VnodeId) -> Option<VnodeKind>;

    /// Apply a masked attribute update, preserving whatever bits the
    /// concrete field layout says should survive (e.g. the `S_IFMT` type
    /// bits of `mode`). No-op if `id` no longer resolves.
    fn set_attr(&mut self, id: VnodeId, iattr: &IAttr);

    /// Allocate a new synthetic vnode as an immediate child of `parent`,
    /// inheriting `uid`/`gid`/`origin_mount` from `parent` the way the
    /// original `VnodeCreate` does, and register it in the path cache under
    /// `name`.
    fn create_child(
        &mut self,
        parent: VnodeId,
        name: &str,
        kind: VnodeKind,
        mode: u32,
    ) -> VfsResult<VnodeId>;

    /// Children of `id` memoized in the path cache, in list order, starting
    /// at position `start_idx`. Used by the generic `Readdir` helper.
    fn cached_children(&self, id: VnodeId, start_idx: usize) -> Vec<(String, VnodeId)>;
}

/// Per-vnode capability table (spec §4.D). Every method has a default body
/// returning the error an absent function pointer would produce in the
/// original C table, exactly like `axfs_vfs::VfsNodeOps`'s defaults.
pub trait VnodeOps: Send + Sync {
    /// Resolve a single path segment inside a directory.
    fn lookup(&self, store: &mut dyn VnodeStore, parent: VnodeId, name: RelPath) -> VfsResult<VnodeId> {
        let _ = (store, parent, name);
        vnode_err!(NoEntry)
    }

    /// Create a new child, inheriting `uid`/`gid`/`origin_mount`/`ops` from
    /// `parent` per spec §4.D.
    fn create(
        &self,
        store: &mut dyn VnodeStore,
        parent: VnodeId,
        name: RelPath,
        mode: u32,
    ) -> VfsResult<VnodeId> {
        let _ = (store, parent, name, mode);
        vnode_err!(NoSys)
    }

    /// Release filesystem-private state before the pool reuses the slot.
    fn reclaim(&self, store: &mut dyn VnodeStore, id: VnodeId) -> VfsResult<()> {
        let _ = (store, id);
        Ok(())
    }

    /// Enumerate children, honoring `stream`'s cursor and cap.
    fn readdir(&self, store: &dyn VnodeStore, id: VnodeId, stream: &mut DirStream) -> VfsResult<usize> {
        let _ = (store, id, stream);
        vnode_err!(NoSys)
    }

    /// Fill in `mode`/`uid`/`gid`; other fields default to zero.
    fn getattr(&self, store: &dyn VnodeStore, id: VnodeId) -> VfsResult<VnodeAttr> {
        store.attr(id).ok_or(VfsError::Invalid)
    }

    /// Apply a masked attribute update.
    fn chattr(&self, store: &mut dyn VnodeStore, id: VnodeId, iattr: &IAttr) -> VfsResult<()> {
        if store.attr(id).is_none() {
            return vnode_err!(Invalid);
        }
        store.set_attr(id, iattr);
        Ok(())
    }

    /// Do something when a directory is opened. No-op by default, matching
    /// the read-only in-memory directories spec §4.D describes.
    fn opendir(&self, store: &mut dyn VnodeStore, id: VnodeId) -> VfsResult<()> {
        let _ = (store, id);
        Ok(())
    }

    /// Do something when a directory is closed.
    fn closedir(&self, store: &mut dyn VnodeStore, id: VnodeId) -> VfsResult<()> {
        let _ = (store, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyStore;
    impl VnodeStore for EmptyStore {
        fn attr(&self, _id: VnodeId) -> Option<VnodeAttr> {
            None
        }
        fn kind(&self, _id: VnodeId) -> Option<VnodeKind> {
            None
        }
        fn set_attr(&mut self, _id: VnodeId, _iattr: &IAttr) {}
        fn create_child(
            &mut self,
            _parent: VnodeId,
            _name: &str,
            _kind: VnodeKind,
            _mode: u32,
        ) -> VfsResult<VnodeId> {
            vnode_err!(NoSys)
        }
        fn cached_children(&self, _id: VnodeId, _start_idx: usize) -> Vec<(String, VnodeId)> {
            Vec::new()
        }
    }

    struct Defaults;
    impl VnodeOps for Defaults {}

    #[test]
    fn default_lookup_is_no_entry() {
        let mut store = EmptyStore;
        let id = VnodeId::from_raw(0, 0);
        let ops = Defaults;
        assert_eq!(
            ops.lookup(&mut store, id, RelPath::new("x")),
            Err(VfsError::NoEntry)
        );
    }

    #[test]
    fn default_create_is_no_sys() {
        let mut store = EmptyStore;
        let id = VnodeId::from_raw(0, 0);
        let ops = Defaults;
        assert_eq!(
            ops.create(&mut store, id, RelPath::new("x"), 0o644),
            Err(VfsError::NoSys)
        );
    }
}
