//! Root swap and mount cover/uncover hooks (spec §4.E), grounded on
//! `ChangeRoot`/`ChangeRootInternal`/`VnodeDevInit` in
//! `original_source/fs/vfs/vnode.c`.

use alloc::string::String;

use vnode_vfs::{VnodeFlags, VnodeId, VnodeKind, S_IFDIR};

use crate::pool::VfsInner;
use crate::walk::{self, LookupFlags};

/// `dev_init()`: creates `/dev` via `lookup("/dev", CREATE|DUMMY)`,
/// allocates a mount record covering it, and marks the
/// `MountOrigin`/`MountNew` relationship (spec §4.E, Invariant 7).
///
/// `/dev` has no backing filesystem distinct from the synthetic vnode
/// itself, so — absent a real mount table, which is out of scope (spec
/// §1) — this mount's two sides are the same vnode: `vnode_covered` and
/// `vnode_be_covered` both name `/dev`'s own vnode, which therefore carries
/// both `MOUNT_NEW` and `MOUNT_ORIGIN`. See `DESIGN.md` for why this reading
/// was chosen over the original's `MountAlloc(devNode, NULL)` call, whose
/// second (`vnodeBeCovered`) argument is out of scope to reproduce exactly.
pub(crate) fn dev_init(inner: &mut VfsInner) -> vnode_errno::VfsResult<VnodeId> {
    let (dev, status) = walk::lookup_at(
        inner,
        "/dev",
        LookupFlags::CREATE | LookupFlags::DUMMY,
        None,
    )?;
    status?;

    {
        let slot = inner.slot_mut(dev)?;
        slot.kind = VnodeKind::Directory;
        slot.mode = S_IFDIR | inner.config().dev_vnode_mode;
    }

    inner.bind_mount(dev, dev)?;

    Ok(dev)
}

/// `change_root(new_root)`: swap `root` and rewire the two well-known child
/// mounts (`/proc`, `/dev`) so their identity survives the swap (spec
/// §4.E). Spec §9's open question ("must `change_root` itself quiesce
/// concurrent walkers") is resolved conservatively here: the whole
/// operation runs under one acquisition of `vnode_mux` (the caller already
/// holds it for the duration of this call, per `Vfs::change_root`).
pub(crate) fn change_root(inner: &mut VfsInner, new_root: VnodeId) {
    let old_root = inner.root.replace(new_root);
    if let Some(old_root) = old_root {
        rewire_mount(inner, old_root, "proc");
        rewire_mount(inner, old_root, "dev");
    }
}

/// `ChangeRootInternal` for a single well-known mount name: find the old
/// root's cached child by `name`, read the mount it covers, free that one
/// path-cache entry, resolve the same name under the new root, and mark the
/// resolved vnode as the mount's new covered point.
fn rewire_mount(inner: &mut VfsInner, old_root: VnodeId, name: &str) {
    let Some(old_child) = inner.path_cache.lookup(old_root, name) else {
        return;
    };
    let Some(mount_id) = inner.slot(old_child).ok().and_then(|s| s.new_mount) else {
        return;
    };

    inner.path_cache.remove_entry(old_root, name);

    let mut absolute = String::with_capacity(name.len() + 1);
    absolute.push('/');
    absolute.push_str(name);
    let Ok((resolved, status)) = walk::lookup_at(inner, &absolute, LookupFlags::empty(), None) else {
        return;
    };
    if status.is_err() {
        // Mirrors the original's "NOT exist in rootfs" log-and-continue:
        // the new root simply has no mount point under this name.
        return;
    }

    inner.mounts.set_vnode_be_covered(mount_id, resolved);
    if let Ok(slot) = inner.slot_mut(resolved) {
        slot.new_mount = Some(mount_id);
        slot.flags.insert(VnodeFlags::MOUNT_ORIGIN);
    }
}
