//! Attribute views exchanged with `Getattr`/`Chattr` (spec §4.D).

/// POSIX permission triple plus kind, as returned by `Getattr`. Fields other
/// than `mode`/`uid`/`gid` default to zero, matching the original
/// `VnodeGetattr`, which only ever fills those three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VnodeAttr {
    /// POSIX mode bits, including the `S_IFMT` type bits.
    pub mode: u32,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
}

/// Bitmask of which fields of an [`IAttr`] are actually being changed,
/// mirroring the original `IATTR.attr_chg_valid` bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IAttr {
    /// New mode bits to apply, if any. Only the permission bits are taken;
    /// the `S_IFMT` type bits already stored on the vnode are preserved
    /// (spec §4.D: "preserves the `S_IFMT` bits already stored").
    pub mode: Option<u32>,
    /// New owning uid, if any.
    pub uid: Option<u32>,
    /// New owning gid, if any.
    pub gid: Option<u32>,
}

/// POSIX `S_IFMT` mask, kept here rather than in `ruxvnode` since both the
/// default `chattr` implementation and test assertions need the same
/// constant.
pub const S_IFMT: u32 = 0o170000;

/// POSIX `S_IFDIR` type bit, needed wherever a directory's `mode` is
/// assembled from a bare permission triple (e.g. `dev_init`, spec §4.E).
pub const S_IFDIR: u32 = 0o040000;

impl IAttr {
    /// `true` if this request changes nothing.
    pub fn is_empty(&self) -> bool {
        self.mode.is_none() && self.uid.is_none() && self.gid.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_iattr_changes_nothing() {
        assert!(IAttr::default().is_empty());
        assert!(!IAttr {
            mode: Some(0o644),
            ..Default::default()
        }
        .is_empty());
    }
}
