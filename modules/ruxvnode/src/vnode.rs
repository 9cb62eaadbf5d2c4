//! The pooled vnode object itself (spec §3), registry component B.

use alloc::string::String;
use alloc::sync::Arc;

use spin::Mutex;
use vnode_vfs::{MountId, VnodeFlags, VnodeId, VnodeKind, VnodeOps};

/// Opaque page-cache control block. Page-cache plumbing is explicitly out
/// of scope (spec §1); this stub exists only so the vnode's shape matches
/// spec §3 ("mapping: embedded page-cache control block, opaque to the
/// core") and so a real page-cache subsystem would have a field to own.
#[derive(Default)]
pub struct PageMapping {
    /// Stand-in for the page-cache subsystem's own lock, kept separate
    /// from `vnode_mux` per spec §5 ("has its own spinlock/mutex pair
    /// owned by the page cache subsystem and is opaque to the core").
    _lock: Mutex<()>,
}

/// Which of the three disjoint pool states (Invariant 1) a vnode is
/// currently in. Tracked explicitly so debug builds can assert Invariant 1
/// rather than trust bookkeeping silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VnodeState {
    Free,
    Virtual,
    Active,
}

/// The pooled vnode object. Lives inside the slab owned by
/// [`crate::pool::VfsInner`]; never constructed or moved outside it.
pub(crate) struct VnodeSlot {
    pub kind: VnodeKind,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub use_count: u32,
    pub flags: VnodeFlags,
    pub ops: Arc<dyn VnodeOps>,
    pub file_path: Option<String>,
    pub parent: Option<VnodeId>,
    pub origin_mount: Option<MountId>,
    pub new_mount: Option<MountId>,
    pub mapping: PageMapping,
    pub state: VnodeState,
    /// Active-list intrusive links; unused (left `None`) while the vnode
    /// is on the free or virtual list, reusing the single link field the
    /// original `actFreeEntry` reused across all three lists (Invariant 1).
    pub(crate) list_prev: Option<VnodeId>,
    pub(crate) list_next: Option<VnodeId>,
}

impl VnodeSlot {
    pub fn new(ops: Arc<dyn VnodeOps>, state: VnodeState) -> Self {
        Self {
            kind: VnodeKind::Unknown,
            mode: 0,
            uid: 0,
            gid: 0,
            use_count: 0,
            flags: VnodeFlags::empty(),
            ops,
            file_path: None,
            parent: None,
            origin_mount: None,
            new_mount: None,
            mapping: PageMapping::default(),
            state,
            list_prev: None,
            list_next: None,
        }
    }

    /// `true` if this vnode's identity (bound to `devfs_ops` by reference
    /// equality) marks it synthetic, i.e. not backed by any filesystem
    /// driver.
    pub fn is_synthetic(&self, devfs_ops: &Arc<dyn VnodeOps>) -> bool {
        Arc::ptr_eq(&self.ops, devfs_ops)
    }

    /// Invariant 3: pinned or mount-flagged vnodes are never reclaimable.
    pub fn is_reclaimable(&self) -> bool {
        self.use_count == 0
            && !self.flags.contains(VnodeFlags::MOUNT_ORIGIN)
            && !self.flags.contains(VnodeFlags::MOUNT_NEW)
    }
}
