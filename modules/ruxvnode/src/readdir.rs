//! Directory-stream enumeration (spec §4.F), shared by every `VnodeOps`
//! implementation whose children live in the path cache (currently just
//! [`crate::devfs::DevFsOps`], but any future driver gets it for free).

use vnode_errno::{vnode_err, VfsResult};
use vnode_vfs::{DirStream, VfsDirEntry, VnodeId, VnodeStore, MAX_NAME_LEN};

/// Fill `stream` from `id`'s memoized children, honoring `fd_position` and
/// `read_cnt`, returning the number of entries filled.
pub(crate) fn readdir_via_cache(
    store: &dyn VnodeStore,
    id: VnodeId,
    stream: &mut DirStream,
) -> VfsResult<usize> {
    let start = stream.fd_position as usize;
    let children = store.cached_children(id, start);
    stream.entries.clear();

    let cap = stream.read_cnt;
    let mut filled = 0usize;
    for (offset, (name, _child)) in children.into_iter().enumerate() {
        if filled >= cap {
            break;
        }
        if name.len() > MAX_NAME_LEN {
            return vnode_err!(NameTooLong);
        }
        stream.entries.push(VfsDirEntry {
            name,
            d_off: (start + offset) as u64,
        });
        filled += 1;
    }
    stream.fd_position += filled as u64;
    Ok(filled)
}
