//! Object heap tests: interning, reference counting, removal and misuse.

use metra_eval::{HeapError, Obj, ObjHeap, Pointer};
use pretty_assertions::assert_eq;

#[test]
fn equal_content_shares_a_pointer() {
    let mut heap = ObjHeap::new();
    let a = heap.allocate_str("meters");
    let b = heap.allocate(Obj::string("meters"));
    let c = heap.allocate_str("feet");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(heap.len(), 2);
    assert_eq!(heap.interned_len(), 2);
}

#[test]
fn intern_hit_does_not_bump_the_count() {
    let mut heap = ObjHeap::new();
    let p = heap.allocate_str("x");
    heap.allocate_str("x");
    heap.allocate_str("x");
    assert_eq!(heap.ref_count(p), Some(1));
}

#[test]
fn refcount_lifecycle() {
    let mut heap = ObjHeap::new();
    let p = heap.allocate_str("temp");
    assert_eq!(heap.ref_count(p), Some(1));

    heap.add_ref(p, 2).unwrap();
    assert_eq!(heap.ref_count(p), Some(3));

    assert_eq!(heap.release(p, 3), Ok(true));
    assert!(!heap.is_alive(p));
    assert_eq!(heap.ref_count(p), None);
    assert!(heap.try_get(p).is_none());

    assert_eq!(heap.release(p, 1), Ok(false));
}

#[test]
fn partial_release_keeps_the_object() {
    let mut heap = ObjHeap::new();
    let p = heap.allocate_str("kept");
    heap.add_ref(p, 1).unwrap();
    assert_eq!(heap.release(p, 1), Ok(true));
    assert!(heap.is_alive(p));
    assert_eq!(heap.get(p).unwrap().as_str(), Some("kept"));
}

#[test]
fn release_underflow_is_an_error() {
    let mut heap = ObjHeap::new();
    let p = heap.allocate_str("a");
    assert_eq!(
        heap.release(p, 2),
        Err(HeapError::Underflow {
            pointer: p,
            held: 1,
            requested: 2
        })
    );
    // A failed release leaves the count alone.
    assert_eq!(heap.ref_count(p), Some(1));
}

#[test]
fn zero_deltas_are_rejected() {
    let mut heap = ObjHeap::new();
    let p = heap.allocate_str("a");
    assert_eq!(heap.add_ref(p, 0), Err(HeapError::NonPositiveDelta));
    assert_eq!(heap.release(p, 0), Err(HeapError::NonPositiveDelta));
}

#[test]
fn add_ref_on_a_dead_pointer_fails() {
    let mut heap = ObjHeap::new();
    let p = heap.allocate_str("a");
    heap.force_free(p);
    assert_eq!(heap.add_ref(p, 1), Err(HeapError::InvalidPointer(p)));
    assert_eq!(
        heap.get(p).unwrap_err().to_string(),
        "invalid pointer ptr#1"
    );
}

#[test]
fn removal_drops_the_intern_mapping() {
    let mut heap = ObjHeap::new();
    let first = heap.allocate_str("again");
    heap.release(first, 1).unwrap();
    assert_eq!(heap.interned_len(), 0);

    let second = heap.allocate_str("again");
    assert_ne!(first, second);
    assert_eq!(heap.ref_count(second), Some(1));
}

#[test]
fn force_free_ignores_the_count() {
    let mut heap = ObjHeap::new();
    let p = heap.allocate_str("pinned");
    heap.add_ref(p, 10).unwrap();
    assert!(heap.force_free(p));
    assert!(!heap.force_free(p));
    assert!(heap.is_empty());
}

#[test]
fn unknown_pointers_are_never_live() {
    let heap = ObjHeap::new();
    let stray = Pointer::from_raw(42);
    assert!(!heap.is_alive(stray));
    assert!(heap.try_get(stray).is_none());
    assert_eq!(heap.get_str(stray), Err(HeapError::InvalidPointer(stray)));
}

#[test]
fn clear_restarts_ids() {
    let mut heap = ObjHeap::new();
    for word in ["a", "b", "c"] {
        heap.allocate_str(word);
    }
    heap.clear();
    assert!(heap.is_empty());
    assert_eq!(heap.allocate_str("z"), Pointer::from_raw(1));
}

#[test]
fn allocation_is_deterministic() {
    let words = ["mm", "cm", "mm", "m", "km", "cm"];
    let ids = |heap: &mut ObjHeap| words.map(|w| heap.allocate_str(w).id());
    let first = ids(&mut ObjHeap::new());
    for i in 0..100 {
        assert_eq!(first, ids(&mut ObjHeap::new()), "determinism failure at iteration {i}");
    }
    assert_eq!(first, [1, 2, 1, 3, 4, 2]);
}
