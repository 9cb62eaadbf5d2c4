//! Vnode cache and path-resolution engine for a small real-time OS VFS.
//!
//! `Vfs` wraps the process-wide mutable state `original_source/fs/vfs/vnode.c`
//! keeps as file-scope globals (`g_rootVnode`, the three lists, `g_vnodeMux`,
//! ...) behind one `spin::Mutex`-guarded context, the way rukos wraps its own
//! singleton filesystem state behind `spin`/`LazyInit` in `ruxfs::root`
//! (`SPEC_FULL.md`§A). Every public method locks once and does its work
//! without releasing the lock until it returns — the walker's mutex-held
//! dispatch discipline (spec §5) extends naturally to the whole surface,
//! and resolves spec §9's open question about whether `change_root` must
//! quiesce concurrent walkers: it does, because it holds the same lock.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod config;
mod defaults;
mod devfs;
mod mount;
mod pool;
mod readdir;
mod root;
mod store;
mod vnode;
mod walk;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::Mutex;

use vnode_errno::VfsResult;
use vnode_vfs::{
    AllowAll, DirStream, IAttr, PermissionPolicy, RelPath, VnodeAttr, VnodeId, VnodeKind, VnodeOps,
};

pub use config::VfsConfig;
pub use defaults::{DEV_VNODE_MODE, LRU_BATCH, MAX_VNODE_SIZE, ROOT_VNODE_MODE};
pub use devfs::DevFsOps;
pub use mount::Mount;
pub use vnode_vfs::MountId;
pub use walk::LookupFlags;

use pool::VfsInner;

/// The vnode cache and path-resolution engine (spec §1-§2). One instance
/// per isolated test case or per kernel boot (spec §9's design note: "wrap
/// them in an explicit `Vfs` context ... tests instantiate an isolated
/// context per case").
pub struct Vfs {
    inner: Mutex<VfsInner>,
}

impl Vfs {
    /// Construct a fresh `Vfs`: allocates the root vnode (itself a
    /// synthetic/virtual-list vnode, exactly as `VnodesInit`'s
    /// `VnodeAlloc(NULL, &g_rootVnode)` does), and fixes its kind, mode and
    /// `file_path` per Invariant 5.
    pub fn new(config: VfsConfig, permission: Arc<dyn PermissionPolicy>) -> VfsResult<Self> {
        let devfs_ops: Arc<dyn VnodeOps> = Arc::new(DevFsOps);
        let mut inner = VfsInner::new(config, devfs_ops, permission);

        let root = inner.alloc(None)?;
        {
            let slot = inner.slot_mut(root).expect("just allocated");
            slot.kind = VnodeKind::Directory;
            slot.mode = defaults::ROOT_VNODE_MODE;
            slot.file_path = Some(String::from("/"));
        }
        inner.root = Some(root);

        Ok(Self {
            inner: Mutex::new(inner),
        })
    }

    /// `Vfs::new` with the ABI-default config and a permissive policy —
    /// the common case for production wiring and most tests.
    pub fn new_default() -> VfsResult<Self> {
        Self::new(VfsConfig::default(), Arc::new(AllowAll))
    }

    // ---- component A: vnode pool ----------------------------------------

    /// `alloc(ops_opt)` (spec §4.A).
    pub fn alloc(&self, ops: Option<Arc<dyn VnodeOps>>) -> VfsResult<VnodeId> {
        self.inner.lock().alloc(ops)
    }

    /// `free(vnode)` (spec §4.A).
    pub fn free(&self, id: VnodeId) -> VfsResult<()> {
        self.inner.lock().free(id)
    }

    /// `free_all(mount)` (spec §4.A).
    pub fn free_all(&self, mount: MountId) -> VfsResult<()> {
        self.inner.lock().free_all(mount)
    }

    /// `in_use(mount)` (spec §4.A).
    pub fn in_use(&self, mount: MountId) -> bool {
        self.inner.lock().in_use(mount)
    }

    /// Count of physically allocated slots (`total_size`).
    pub fn total_size(&self) -> usize {
        self.inner.lock().total_size()
    }

    /// Count of recycled slots awaiting reuse (`free_size`).
    pub fn free_size(&self) -> usize {
        self.inner.lock().free_size()
    }

    /// Pin a vnode against reclamation (`VnodeHold`'s per-vnode
    /// counterpart; see `DESIGN.md` for why spec §6's `hold`/`drop` pair is
    /// retargeted here to the per-vnode `use_count`, not the raw mutex the
    /// original functions of the same name actually guard).
    pub fn hold(&self, id: VnodeId) -> VfsResult<()> {
        self.inner.lock().hold(id)
    }

    /// Undo one `hold`.
    pub fn release(&self, id: VnodeId) -> VfsResult<()> {
        self.inner.lock().release(id)
    }

    // ---- component C: path walker ---------------------------------------

    /// `lookup(path, flags) = lookup_at(path, flags, None)` (spec §4.C).
    pub fn lookup(&self, path: &str, flags: LookupFlags) -> VfsResult<(VnodeId, VfsResult<()>)> {
        self.lookup_at(path, flags, None)
    }

    /// `lookup_at(path, flags, start_opt)` (spec §4.C).
    pub fn lookup_at(
        &self,
        path: &str,
        flags: LookupFlags,
        start: Option<VnodeId>,
    ) -> VfsResult<(VnodeId, VfsResult<()>)> {
        let mut inner = self.inner.lock();
        walk::lookup_at(&mut inner, path, flags, start)
    }

    // ---- component E: root & mount hooks --------------------------------

    /// `get_root()` (spec §4.E).
    pub fn get_root(&self) -> VnodeId {
        self.inner.lock().root.expect("Vfs::new always sets root")
    }

    /// `change_root(new_root)` (spec §4.E).
    pub fn change_root(&self, new_root: VnodeId) {
        let mut inner = self.inner.lock();
        root::change_root(&mut inner, new_root);
    }

    /// `dev_init()` (spec §4.E).
    pub fn dev_init(&self) -> VfsResult<VnodeId> {
        let mut inner = self.inner.lock();
        root::dev_init(&mut inner)
    }

    /// Bind a mount record covering `vnode_be_covered` with
    /// `vnode_covered` as the mounted filesystem's root (Invariant 7). The
    /// mount table's own creation path is out of scope (spec §1); this is
    /// the same minimal bind `dev_init` itself uses, exposed so other
    /// bootstrap code — and component E's root-swap rewiring — has
    /// something to install and exercise beyond `/dev`.
    pub fn mount(&self, vnode_covered: VnodeId, vnode_be_covered: VnodeId) -> VfsResult<MountId> {
        self.inner.lock().bind_mount(vnode_covered, vnode_be_covered)
    }

    /// Read back a mount record by id, for callers (and tests) that need to
    /// observe `vnode_covered`/`vnode_be_covered` without walking the tree.
    pub fn mount_info(&self, id: MountId) -> Option<Mount> {
        self.inner.lock().mounts.get(id).copied()
    }

    /// Fix up a freshly allocated synthetic vnode's `kind`/`mode` directly,
    /// the way `VnodeDevInit` sets `devNode->type`/`devNode->mode` straight
    /// on the struct after `VnodeAlloc` — the original has no field
    /// encapsulation, so any caller bootstrapping a synthetic subtree is
    /// expected to patch these up itself. `dev_init` uses the same pattern
    /// inline; this is that pattern generalized for bootstrap code outside
    /// this crate (spec §4.E).
    pub fn bootstrap_kind(&self, id: VnodeId, kind: VnodeKind, mode: u32) -> VfsResult<()> {
        let mut inner = self.inner.lock();
        let slot = inner.slot_mut(id)?;
        slot.kind = kind;
        slot.mode = mode;
        Ok(())
    }

    // ---- component D: ops dispatch ---------------------------------------

    /// `getattr(vnode)` (spec §4.D), dispatched through the vnode's own
    /// `ops` table.
    pub fn getattr(&self, id: VnodeId) -> VfsResult<VnodeAttr> {
        let inner = self.inner.lock();
        let ops = inner.slot(id)?.ops.clone();
        ops.getattr(&*inner, id)
    }

    /// `chattr(vnode, iattr)` (spec §4.D).
    pub fn chattr(&self, id: VnodeId, iattr: &IAttr) -> VfsResult<()> {
        let mut inner = self.inner.lock();
        let ops = inner.slot(id)?.ops.clone();
        ops.chattr(&mut *inner, id, iattr)
    }

    /// `Create(parent, name, mode)` (spec §4.D), dispatched through the
    /// parent's `ops` table. Not named in spec §6's exposed-surface list,
    /// but component D has no other caller-reachable entry point for it;
    /// see `DESIGN.md`.
    pub fn create(&self, parent: VnodeId, name: &str, mode: u32) -> VfsResult<VnodeId> {
        let mut inner = self.inner.lock();
        let ops = inner.slot(parent)?.ops.clone();
        ops.create(&mut *inner, parent, RelPath::new(name), mode)
    }

    // ---- component F: directory stream ------------------------------------

    /// `Readdir(vnode, dirent_stream)` (spec §4.D/§4.F). Same grounding
    /// note as [`Self::create`]: spec §6's literal exposed-surface list
    /// omits it, but component F needs a callable entry point.
    pub fn readdir(&self, id: VnodeId, stream: &mut DirStream) -> VfsResult<usize> {
        let inner = self.inner.lock();
        let ops = inner.slot(id)?.ops.clone();
        ops.readdir(&*inner, id, stream)
    }

    /// `Opendir(vnode, dir)`.
    pub fn opendir(&self, id: VnodeId) -> VfsResult<()> {
        let mut inner = self.inner.lock();
        let ops = inner.slot(id)?.ops.clone();
        ops.opendir(&mut *inner, id)
    }

    /// `Closedir(vnode, dir)`.
    pub fn closedir(&self, id: VnodeId) -> VfsResult<()> {
        let mut inner = self.inner.lock();
        let ops = inner.slot(id)?.ops.clone();
        ops.closedir(&mut *inner, id)
    }

    // ---- component G: admin & introspection -------------------------------

    /// `memory_dump()` (spec §4.G).
    pub fn memory_dump(&self) -> usize {
        self.inner.lock().memory_dump()
    }

    /// `clear_cache()` (spec §4.G).
    pub fn clear_cache(&self) -> usize {
        self.inner.lock().clear_cache()
    }

    // ---- component B: registry list heads (introspection only) ----------

    /// Snapshot of the free list (spec §6's "the three list heads").
    pub fn free_list(&self) -> Vec<VnodeId> {
        self.inner.lock().free_list()
    }

    /// Snapshot of the virtual (synthetic) list.
    pub fn virtual_list(&self) -> Vec<VnodeId> {
        self.inner.lock().virtual_list()
    }

    /// Snapshot of the active list, LRU-ordered (Invariant 6).
    pub fn active_list(&self) -> Vec<VnodeId> {
        self.inner.lock().active_list()
    }

    /// `parent` (spec §3: "weak back reference used only for navigation and
    /// readdir"), for callers that want to confirm a synthetic child was
    /// attached under the directory they expect without walking the tree.
    pub fn parent_of(&self, id: VnodeId) -> VfsResult<Option<VnodeId>> {
        Ok(self.inner.lock().slot(id)?.parent)
    }

    /// The default device ops table (spec §6's "and the default device ops
    /// table"), for callers that want to compare a vnode's `ops` against it
    /// by identity the way the walker gates LRU refresh.
    pub fn devfs_ops(&self) -> Arc<dyn VnodeOps> {
        self.inner.lock().devfs_ops.clone()
    }
}
