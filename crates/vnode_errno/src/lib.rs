//! Error codes returned by the vnode cache and path-resolution engine.
//!
//! Mirrors the shape of `axerrno` from the wider rukos tree: a closed,
//! `Copy` error enum, a `VfsResult` alias, and a `vnode_err!` macro that logs
//! a `warn!` before constructing the `Err`, so call sites never have to
//! remember to log a failure themselves.

#![cfg_attr(not(test), no_std)]

/// The error taxonomy of the vnode cache, mapped to the POSIX-style negative
/// codes the original kernel module returns (see spec §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VfsError {
    /// No slot available and reclamation failed (`-ENOMEM`).
    NoMemory,
    /// `free` was attempted while `use_count > 0` (`-EBUSY`).
    Busy,
    /// Path component absent and `CREATE` was not requested (`-ENOENT`).
    NoEntry,
    /// An intermediate path component is not a directory (`-ENOTDIR`).
    NotDir,
    /// A string copy would exceed a fixed buffer (`-ENAMETOOLONG`).
    NameTooLong,
    /// Permission check failed on an intermediate directory (`-EACCES`).
    Denied,
    /// A filesystem vnode lacks the requested operation (`-ENOSYS`).
    NoSys,
    /// A null/invalid argument was supplied where none is allowed (`-EINVAL`).
    Invalid,
}

impl VfsError {
    /// The POSIX errno mnemonic this variant stands in for.
    pub const fn errno_name(self) -> &'static str {
        match self {
            VfsError::NoMemory => "ENOMEM",
            VfsError::Busy => "EBUSY",
            VfsError::NoEntry => "ENOENT",
            VfsError::NotDir => "ENOTDIR",
            VfsError::NameTooLong => "ENAMETOOLONG",
            VfsError::Denied => "EACCES",
            VfsError::NoSys => "ENOSYS",
            VfsError::Invalid => "EINVAL",
        }
    }
}

impl core::fmt::Display for VfsError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.errno_name())
    }
}

/// Alias of [`Result<T, VfsError>`], defaulting to the zero-sized success
/// case the way `axerrno::AxResult` does.
pub type VfsResult<T = ()> = Result<T, VfsError>;

/// Builds a [`VfsError`] and logs a `warn!` describing it, mirroring
/// `axerrno::ax_err_type!`.
#[macro_export]
macro_rules! vnode_err_type {
    ($err: ident) => {{
        log::warn!("[VfsError::{:?}]", $crate::VfsError::$err);
        $crate::VfsError::$err
    }};
    ($err: ident, $msg: expr) => {{
        log::warn!("[VfsError::{:?}] {}", $crate::VfsError::$err, $msg);
        $crate::VfsError::$err
    }};
}

/// Shorthand for `Err(vnode_err_type!(...))`, mirroring `axerrno::ax_err!`.
#[macro_export]
macro_rules! vnode_err {
    ($err: ident) => {
        Err($crate::vnode_err_type!($err))
    };
    ($err: ident, $msg: expr) => {
        Err($crate::vnode_err_type!($err, $msg))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_names_are_stable() {
        assert_eq!(VfsError::NoMemory.errno_name(), "ENOMEM");
        assert_eq!(VfsError::NoSys.errno_name(), "ENOSYS");
    }

    #[test]
    fn macro_builds_expected_variant() {
        fn fails() -> VfsResult<()> {
            vnode_err!(Busy)
        }
        assert_eq!(fails(), Err(VfsError::Busy));
    }
}
