//! End-to-end scenarios (spec §8 "literal" list), one isolated `Vfs`
//! context per case (spec §9's design note).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use ruxvnode::{LookupFlags, Vfs, VfsConfig};
use vnode_errno::VfsError;
use vnode_vfs::{AllowAll, DirStream, IAttr, RelPath, VnodeId, VnodeKind, VnodeOps, VnodeStore};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn fresh_root_has_expected_mode() {
    init_logger();
    let vfs = Vfs::new_default().unwrap();

    let (root, status) = vfs.lookup("/", LookupFlags::empty()).unwrap();
    status.unwrap();
    assert_eq!(root, vfs.get_root());

    let attr = vfs.getattr(root).unwrap();
    assert_eq!(attr.mode, 0o40777);
}

#[test]
fn dev_init_then_dummy_create_under_dev() {
    let vfs = Vfs::new_default().unwrap();
    let dev = vfs.dev_init().unwrap();

    let (resolved, status) = vfs.lookup("/dev", LookupFlags::empty()).unwrap();
    status.unwrap();
    assert_eq!(resolved, dev);

    let (_, status) = vfs.lookup("/dev/none", LookupFlags::empty()).unwrap();
    assert_eq!(status, Err(VfsError::NoEntry));

    let (null, status) = vfs
        .lookup("/dev/null", LookupFlags::CREATE | LookupFlags::DUMMY)
        .unwrap();
    status.unwrap();
    assert!(vfs.virtual_list().contains(&null));
    assert_eq!(vfs.parent_of(null).unwrap(), Some(dev));
}

#[test]
fn saturate_pool_then_reclaim_by_releasing_one() {
    let vfs = Vfs::new(VfsConfig::small(4), Arc::new(AllowAll)).unwrap();
    let ops: Arc<dyn VnodeOps> = Arc::new(NoopOps);

    let mut held = Vec::new();
    loop {
        match vfs.alloc(Some(ops.clone())) {
            Ok(id) => {
                vfs.hold(id).unwrap();
                held.push(id);
            }
            Err(VfsError::NoMemory) => break,
            Err(e) => panic!("unexpected error: {e:?}"),
        }
    }
    assert!(!held.is_empty());
    assert_eq!(vfs.alloc(Some(ops.clone())), Err(VfsError::NoMemory));

    let before = vfs.total_size();
    let victim = held[0];
    vfs.release(victim).unwrap();

    let fresh = vfs.alloc(Some(ops)).unwrap();
    assert_eq!(vfs.total_size(), before);
    assert_ne!(fresh, victim);
}

#[test]
fn directory_readdir_reflects_create_and_unlink() {
    let vfs = Vfs::new_default().unwrap();

    let (a, status) = vfs
        .lookup("/a", LookupFlags::CREATE | LookupFlags::DUMMY)
        .unwrap();
    status.unwrap();
    vfs.bootstrap_kind(a, VnodeKind::Directory, 0o755).unwrap();

    let (b, status) = vfs
        .lookup("/a/b", LookupFlags::CREATE | LookupFlags::DUMMY)
        .unwrap();
    status.unwrap();
    vfs.bootstrap_kind(b, VnodeKind::Regular, 0o644).unwrap();

    vfs.opendir(a).unwrap();
    let mut stream = DirStream::new(8);
    let filled = vfs.readdir(a, &mut stream).unwrap();
    assert_eq!(filled, 1);
    assert_eq!(stream.entries[0].name, "b");
    vfs.closedir(a).unwrap();

    vfs.free(b).unwrap();

    let mut stream = DirStream::new(8);
    let filled = vfs.readdir(a, &mut stream).unwrap();
    assert_eq!(filled, 0);
}

#[test]
fn mount_proc_survives_change_root() {
    let vfs = Vfs::new_default().unwrap();

    let (proc_old, status) = vfs
        .lookup("/proc", LookupFlags::CREATE | LookupFlags::DUMMY)
        .unwrap();
    status.unwrap();
    vfs.bootstrap_kind(proc_old, VnodeKind::Directory, 0o555)
        .unwrap();
    let mount_id = vfs.mount(proc_old, proc_old).unwrap();

    let new_root = vfs.alloc(Some(Arc::new(ProcDirOps))).unwrap();
    vfs.bootstrap_kind(new_root, VnodeKind::Directory, 0o755)
        .unwrap();

    vfs.change_root(new_root);
    assert_eq!(vfs.get_root(), new_root);

    // `lookup("/proc")` resolves the new root's own "proc" child, but that
    // child now carries `MOUNT_ORIGIN`, so `convert_if_mounted` redirects the
    // walk to the mount's root — the same `proc_old` vnode the mount always
    // pointed at (spec §8 scenario 5: "returns the mount root").
    let (resolved, status) = vfs.lookup("/proc", LookupFlags::empty()).unwrap();
    status.unwrap();
    assert_eq!(resolved, proc_old);

    // The rewire itself only ever touches `vnode_be_covered` — the side
    // naming which vnode in the *covering* filesystem hides the mount.
    let mount = vfs.mount_info(mount_id).unwrap();
    assert_eq!(mount.vnode_covered, proc_old);
    assert_ne!(mount.vnode_be_covered, proc_old);
    assert_eq!(vfs.parent_of(mount.vnode_be_covered).unwrap(), Some(new_root));
}

#[test]
fn concurrent_cold_lookup_dispatches_exactly_once() {
    let vfs = Arc::new(Vfs::new_default().unwrap());
    let calls = Arc::new(AtomicUsize::new(0));

    let dir = vfs
        .alloc(Some(Arc::new(CountingDirOps {
            calls: calls.clone(),
        })))
        .unwrap();
    vfs.bootstrap_kind(dir, VnodeKind::Directory, 0o755).unwrap();

    let mut handles = Vec::new();
    for _ in 0..2 {
        let vfs = vfs.clone();
        handles.push(thread::spawn(move || {
            vfs.lookup_at("child", LookupFlags::empty(), Some(dir))
        }));
    }
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();

    let child = results[0].0;
    for (id, status) in &results {
        status.as_ref().unwrap();
        assert_eq!(*id, child);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(vfs.getattr(child).unwrap().mode, 0o644);
}

struct NoopOps;
impl VnodeOps for NoopOps {}

/// Minimal driver double whose only child is `proc`, standing in for a real
/// filesystem's root directory once `change_root` points at it.
struct ProcDirOps;
impl VnodeOps for ProcDirOps {
    fn lookup(&self, store: &mut dyn VnodeStore, parent: VnodeId, name: RelPath) -> vnode_errno::VfsResult<VnodeId> {
        if name.as_str() == "proc" {
            store.create_child(parent, "proc", VnodeKind::Directory, 0o555)
        } else {
            Err(VfsError::NoEntry)
        }
    }
}

/// Driver double with a single child `"child"`, counting how many times
/// `lookup` actually dispatches — used to prove the path cache, not the
/// driver, answers the second of two concurrent lookups for the same name.
struct CountingDirOps {
    calls: Arc<AtomicUsize>,
}
impl VnodeOps for CountingDirOps {
    fn lookup(&self, store: &mut dyn VnodeStore, parent: VnodeId, name: RelPath) -> vnode_errno::VfsResult<VnodeId> {
        if name.as_str() != "child" {
            return Err(VfsError::NoEntry);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        store.create_child(parent, "child", VnodeKind::Regular, 0o644)
    }
}

#[test]
fn chattr_round_trip_preserves_ifmt_bits() {
    let vfs = Vfs::new_default().unwrap();
    let root = vfs.get_root();

    vfs.chattr(
        root,
        &IAttr {
            mode: Some(0o700),
            uid: Some(42),
            gid: Some(7),
        },
    )
    .unwrap();

    let attr = vfs.getattr(root).unwrap();
    assert_eq!(attr.uid, 42);
    assert_eq!(attr.gid, 7);
    assert_eq!(attr.mode & 0o170000, 0o040000); // S_IFMT preserved
    assert_eq!(attr.mode & !0o170000, 0o700);
}

#[test]
fn trailing_slashes_resolve_to_the_same_vnode() {
    let vfs = Vfs::new_default().unwrap();
    let (a, status) = vfs
        .lookup("/a", LookupFlags::CREATE | LookupFlags::DUMMY)
        .unwrap();
    status.unwrap();
    vfs.bootstrap_kind(a, VnodeKind::Directory, 0o755).unwrap();
    let (b, status) = vfs
        .lookup("/a/b", LookupFlags::CREATE | LookupFlags::DUMMY)
        .unwrap();
    status.unwrap();

    let (plain, status) = vfs.lookup("/a/b", LookupFlags::empty()).unwrap();
    status.unwrap();
    let (trailing, status) = vfs.lookup("/a/b///", LookupFlags::empty()).unwrap();
    status.unwrap();

    assert_eq!(plain, b);
    assert_eq!(trailing, b);
}
