//! The built-in synthetic (device) ops table (spec §4.D): `Lookup` always
//! fails since device nodes only ever come from the path cache, and
//! `Create` always forces the *type* to a character device regardless of
//! what the caller asked for, while passing the requested mode bits
//! through unchanged, mirroring `VnodeCreate` in
//! `original_source/fs/vfs/vnode.c` (see `SPEC_FULL.md`§F).

use vnode_errno::VfsResult;
use vnode_vfs::{DirStream, RelPath, VnodeId, VnodeKind, VnodeOps, VnodeStore};

use crate::readdir::readdir_via_cache;

/// Identity marker bound to every synthetic vnode's `ops` field. The walker
/// gates LRU refresh on `ops == devfs_ops` by pointer identity (spec §9),
/// so this type carries no state of its own — one instance is shared via
/// `Arc` across the whole pool.
#[derive(Debug, Default)]
pub struct DevFsOps;

impl VnodeOps for DevFsOps {
    fn create(
        &self,
        store: &mut dyn VnodeStore,
        parent: VnodeId,
        name: RelPath,
        mode: u32,
    ) -> VfsResult<VnodeId> {
        // Only the type is forced to a character device; the requested
        // mode bits are passed through unchanged, matching `VnodeCreate`'s
        // `newVnode->mode = mode` assignment.
        store.create_child(parent, name.as_str(), VnodeKind::Char, mode)
    }

    fn readdir(&self, store: &dyn VnodeStore, id: VnodeId, stream: &mut DirStream) -> VfsResult<usize> {
        readdir_via_cache(store, id, stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::String;
    use alloc::vec::Vec;
    use vnode_vfs::{VnodeAttr, IAttr};

    struct FakeStore {
        next: u32,
        children: Vec<(String, VnodeId)>,
        last_kind_mode: Option<(VnodeKind, u32)>,
    }

    impl VnodeStore for FakeStore {
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
            name: &str,
            kind: VnodeKind,
            mode: u32,
        ) -> VfsResult<VnodeId> {
            let id = VnodeId::from_raw(self.next, 0);
            self.next += 1;
            self.children.push((String::from(name), id));
            self.last_kind_mode = Some((kind, mode));
            Ok(id)
        }
        fn cached_children(&self, _id: VnodeId, start_idx: usize) -> Vec<(String, VnodeId)> {
            self.children.iter().skip(start_idx).cloned().collect()
        }
    }

    #[test]
    fn create_forces_char_kind_but_passes_mode_through() {
        let mut store = FakeStore {
            next: 1,
            children: Vec::new(),
            last_kind_mode: None,
        };
        let ops = DevFsOps;
        let parent = VnodeId::from_raw(0, 0);
        let child = ops
            .create(&mut store, parent, RelPath::new("null"), 0o644)
            .unwrap();
        assert_eq!(store.children, alloc::vec![(String::from("null"), child)]);
        assert_eq!(store.last_kind_mode, Some((VnodeKind::Char, 0o644)));
    }

    #[test]
    fn readdir_honors_cap_and_cursor() {
        let store = FakeStore {
            next: 1,
            children: alloc::vec![
                (String::from("null"), VnodeId::from_raw(1, 0)),
                (String::from("zero"), VnodeId::from_raw(2, 0)),
            ],
            last_kind_mode: None,
        };
        let ops = DevFsOps;
        let id = VnodeId::from_raw(0, 0);
        let mut stream = DirStream::new(1);
        let filled = ops.readdir(&store, id, &mut stream).unwrap();
        assert_eq!(filled, 1);
        assert_eq!(stream.entries[0].name, "null");
        assert_eq!(stream.fd_position, 1);

        let filled = ops.readdir(&store, id, &mut stream).unwrap();
        assert_eq!(filled, 1);
        assert_eq!(stream.entries[0].name, "zero");
        assert_eq!(stream.fd_position, 2);
    }
}
