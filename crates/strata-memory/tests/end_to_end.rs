//! Layout-driven allocation and access through a bounded scope.

use strata_core::{ByteOrder, ErrorKind, MemoryError};
use strata_layout::PathElement;
use strata_memory::{Address, Scope, ValueHandle};
use strata_test_utils::{init_logging, packet_layout, point_layout, write_point, POINT_BYTES};

#[test]
fn point_in_a_64_bit_scope() {
    init_logging();
    let point = point_layout();
    assert_eq!(point.bits_size().unwrap(), 64);
    assert_eq!(point.bits_alignment(), 32);

    let mut scope = Scope::bounded(POINT_BYTES).unwrap();
    let region = write_point(&mut scope, 3, 4).unwrap();
    let y = ValueHandle::new(&point, &[PathElement::member("y")]).unwrap();
    assert_eq!(y.get::<u32>(&region.base_address()).unwrap(), 4);

    let err = scope.allocate(&point).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
    assert_eq!(scope.allocated_bytes(), POINT_BYTES);
    scope.close().unwrap();
}

#[test]
fn packet_fields_through_handles() {
    let packet = packet_layout();
    let mut scope = Scope::unbounded();
    let region = scope.allocate(&packet).unwrap();
    let base = region.base_address();

    let len = ValueHandle::new(&packet, &[PathElement::member("len")]).unwrap();
    let wide = ValueHandle::new(
        &packet,
        &[PathElement::member("flags"), PathElement::member("wide")],
    )
    .unwrap();
    let short = ValueHandle::new(
        &packet,
        &[PathElement::member("flags"), PathElement::member("short")],
    )
    .unwrap();
    let last = ValueHandle::new(
        &packet,
        &[PathElement::member("body"), PathElement::index(11)],
    )
    .unwrap();

    len.set(&base, 12u32).unwrap();
    wide.set(&base, 0x0001_0002u32).unwrap();
    last.set(&base, 0xEEu8).unwrap();

    assert_eq!(len.byte_offset(), 4);
    assert_eq!(short.get::<u16>(&base).unwrap(), 2);
    assert_eq!(region.get::<u8>(23, ByteOrder::LittleEndian).unwrap(), 0xEE);
}

#[test]
fn copy_between_scopes_writes_nothing_on_overrun() {
    let mut big = Scope::unbounded();
    let mut small = Scope::bounded(4).unwrap();
    let src = big.allocate_copy(&[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    let dst = small.allocate_bytes(4, 1).unwrap();

    let err = Address::copy(&src.base_address(), &dst.base_address(), 8).unwrap_err();
    assert!(matches!(err, MemoryError::OutOfBounds { size: 8, length: 4, .. }));
    assert_eq!(dst.to_vec().unwrap(), vec![0; 4]);

    Address::copy(&src.address_at(4), &dst.base_address(), 4).unwrap();
    assert_eq!(dst.to_vec().unwrap(), vec![5, 6, 7, 8]);
}

#[test]
fn closed_scope_fails_old_addresses() {
    let mut scope = Scope::unbounded();
    let region = write_point(&mut scope, 1, 2).unwrap();
    let addr = region.address_at(4);
    scope.close().unwrap();
    assert_eq!(
        addr.get::<u32>(ByteOrder::BigEndian).unwrap_err().kind(),
        ErrorKind::IllegalState
    );
    assert_eq!(
        scope.allocate(&point_layout()).unwrap_err().kind(),
        ErrorKind::IllegalState
    );
}
