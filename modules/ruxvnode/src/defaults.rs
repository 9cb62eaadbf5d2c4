//! Compile-time constants that are part of the ABI (spec §6).

/// Hard ceiling on the number of vnodes ever physically allocated at once.
pub const MAX_VNODE_SIZE: usize = 4096;

/// Upper bound on vnodes freed by one `reclaim_lru` invocation.
pub const LRU_BATCH: usize = 10;

/// Mode bits a freshly synthesized `/dev` directory is given.
pub const DEV_VNODE_MODE: u32 = 0o755;

/// Mode bits the root vnode is given at init (`S_IRWXU|S_IRWXG|S_IRWXO|S_IFDIR`).
pub const ROOT_VNODE_MODE: u32 = 0o40777;
