//! Node kind, mount flags and the access-check vocabulary (spec §3, §6).

use bitflags::bitflags;

/// What kind of filesystem object a vnode represents (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VnodeKind {
    /// Kind not yet determined; the state every freshly allocated vnode
    /// starts in before a filesystem driver or the synthetic table fills
    /// it in.
    #[default]
    Unknown,
    /// Regular file.
    Regular,
    /// Directory.
    Directory,
    /// Character device.
    Char,
    /// Block device.
    Block,
    /// Named pipe.
    Fifo,
    /// Symbolic link.
    Symlink,
    /// Unix domain socket.
    Socket,
}

impl VnodeKind {
    /// `S_IFMT`-style check used by the walker to reject `a/b` when `a`
    /// isn't a directory.
    pub const fn is_directory(self) -> bool {
        matches!(self, VnodeKind::Directory)
    }
}

bitflags! {
    /// Per-vnode flags (spec §3). `MOUNT_ORIGIN`/`MOUNT_NEW` encode the two
    /// sides of a mount crossing (spec §4.E, Invariant 7).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VnodeFlags: u8 {
        /// This vnode is covered by a child mount; lookups resolving to it
        /// must be redirected to `new_mount`'s root (spec §4.C step 5).
        const MOUNT_ORIGIN = 0b0000_0001;
        /// This vnode is the root vnode of a mounted filesystem.
        const MOUNT_NEW    = 0b0000_0010;
    }
}

/// The three access rights the out-of-scope permission subsystem is asked
/// about (spec §6: `can(vnode, op)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessOp {
    /// Read contents/metadata.
    Read,
    /// Write contents/metadata.
    Write,
    /// Traverse through a directory (spec §4.C's permission gate).
    Exec,
}

/// Policy hook standing in for the out-of-scope POSIX permission table
/// (spec §6). The walker consults this before descending past every
/// intermediate directory. Production embedders provide their own;
/// [`AllowAll`] is the default used when none is configured, matching the
/// original kernel module, which has no notion of a permission check that
/// could reject a lookup unless a real POSIX layer is wired in above it.
pub trait PermissionPolicy: Send + Sync {
    /// Returns whether `op` is permitted on a vnode with the given
    /// attributes.
    fn can(&self, mode: u32, uid: u32, gid: u32, op: AccessOp) -> bool;
}

/// Permissive default: never denies. Matches the scope of this crate, which
/// does not own the POSIX permission table (spec §1).
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl PermissionPolicy for AllowAll {
    fn can(&self, _mode: u32, _uid: u32, _gid: u32, _op: AccessOp) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mount_flags_are_independent_bits() {
        let mut f = VnodeFlags::empty();
        assert!(!f.contains(VnodeFlags::MOUNT_ORIGIN));
        f.insert(VnodeFlags::MOUNT_ORIGIN);
        assert!(f.contains(VnodeFlags::MOUNT_ORIGIN));
        assert!(!f.contains(VnodeFlags::MOUNT_NEW));
    }

    #[test]
    fn allow_all_never_denies() {
        let p = AllowAll;
        assert!(p.can(0, 0, 0, AccessOp::Exec));
    }
}
