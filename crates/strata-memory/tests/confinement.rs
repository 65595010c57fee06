//! Cross-thread misuse is detected, and handoff moves ownership.

use std::sync::mpsc;

use strata_core::{ByteOrder, ErrorKind};
use strata_memory::{Region, Scope};
use strata_test_utils::{on_other_thread, write_point};

#[test]
fn regions_reject_foreign_threads() {
    let mut scope = Scope::unbounded();
    let region = write_point(&mut scope, 7, 8).unwrap();
    let addr = region.base_address();

    let kind = on_other_thread(|| addr.get::<u32>(ByteOrder::BigEndian).unwrap_err().kind());
    assert_eq!(kind, ErrorKind::IllegalState);

    let kind = on_other_thread(|| region.fill(0).unwrap_err().kind());
    assert_eq!(kind, ErrorKind::IllegalState);

    // The owner still sees the original values.
    assert_eq!(addr.get::<u32>(ByteOrder::BigEndian).unwrap(), 7);
}

#[test]
fn scopes_reject_foreign_threads() {
    let mut scope = Scope::bounded(64).unwrap();
    let kind = on_other_thread(|| scope.allocate_bytes(8, 8).unwrap_err().kind());
    assert_eq!(kind, ErrorKind::IllegalState);
    assert_eq!(scope.allocated_bytes(), 0);
}

#[test]
fn foreign_drop_leaves_views_open() {
    let mut scope = Scope::unbounded();
    let region = scope.allocate_bytes(8, 8).unwrap();
    on_other_thread(move || drop(scope));
    // Not closed: the foreign drop only released the scope's references.
    assert!(region.is_alive());
    region.set(0, ByteOrder::LittleEndian, 5u64).unwrap();
    assert_eq!(region.get::<u64>(0, ByteOrder::LittleEndian).unwrap(), 5);
}

#[test]
fn handoff_transfers_a_native_region() {
    let region = Region::allocate_native(16, 8).unwrap();
    region.set(8, ByteOrder::LittleEndian, 99u64).unwrap();

    let (tx, rx) = mpsc::channel::<Region>();
    let worker = std::thread::spawn(move || {
        let region = rx.recv().unwrap();
        let value = region.get::<u64>(8, ByteOrder::LittleEndian).unwrap();
        region.close().unwrap();
        value
    });
    let moved = region.handoff(worker.thread().id()).unwrap();
    assert_eq!(
        region.get::<u64>(8, ByteOrder::LittleEndian).unwrap_err().kind(),
        ErrorKind::IllegalState
    );
    tx.send(moved).unwrap();
    assert_eq!(worker.join().unwrap(), 99);
}
