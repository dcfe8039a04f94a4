//! Crate-level invariant and scenario tests, exercised entirely through the
//! public `Heap` API.
//!
//! The purely internal invariants (header/footer agreement, no two adjacent
//! free blocks, free-list exclusivity, bucket correctness) are exercised as
//! white-box unit tests colocated with `block` and `index`, since they read
//! metadata this crate deliberately keeps private. What lives here are the
//! properties and scenarios observable from outside the crate: alignment,
//! capacity, non-overlap, content preservation on resize, and the documented
//! null/zero edge cases.
//!
//! Every test builds its own `Heap` so none of them can interfere with each
//! other or with the process-wide singleton in `lib.rs`.

use rallocator::Heap;

fn is_aligned(ptr: *mut u8, align: usize) -> bool {
  (ptr as usize) % align == 0
}

fn fresh_heap() -> Heap {
  let heap = Heap::new();
  assert_eq!(heap.init(), 0);
  heap
}

// Property 1: alignment.
#[test]
fn property_alignment() {
  let heap = fresh_heap();
  for size in [1, 7, 8, 15, 16, 17, 100, 1000, 4096] {
    let p = heap.allocate(size);
    assert!(!p.is_null());
    assert!(is_aligned(p, 16), "allocate({size}) returned misaligned pointer");
    heap.release(p);
  }
}

// Property 2: capacity — indirectly verified by writing and reading back the
// full requested span without corruption.
#[test]
fn property_capacity_full_span_is_writable() {
  let heap = fresh_heap();
  let n = 200;
  let p = heap.allocate(n);
  assert!(!p.is_null());
  unsafe {
    for i in 0..n {
      p.add(i).write((i % 256) as u8);
    }
    for i in 0..n {
      assert_eq!(p.add(i).read(), (i % 256) as u8);
    }
  }
  heap.release(p);
}

// Property 3: non-overlap — a batch of live allocations never alias.
#[test]
fn property_non_overlap() {
  let heap = fresh_heap();
  let sizes = [16, 32, 48, 64, 128, 256, 13, 99];
  let mut ranges = Vec::new();

  for &size in &sizes {
    let p = heap.allocate(size);
    assert!(!p.is_null());
    ranges.push((p as usize, size));
  }

  for i in 0..ranges.len() {
    for j in (i + 1)..ranges.len() {
      let (a_start, a_len) = ranges[i];
      let (b_start, b_len) = ranges[j];
      let disjoint = a_start + a_len <= b_start || b_start + b_len <= a_start;
      assert!(disjoint, "allocations {i} and {j} overlap");
    }
  }

  for &(p, _) in &ranges {
    heap.release(p as *mut u8);
  }
}

// Property 8: resize preserves the shared prefix of content.
#[test]
fn property_resize_preserves_content() {
  let heap = fresh_heap();
  let p = heap.allocate(10);
  assert!(!p.is_null());
  unsafe { std::ptr::write_bytes(p, 0x7A, 10) };

  let q = heap.resize(p, 500);
  assert!(!q.is_null());
  assert!(is_aligned(q, 16));
  unsafe {
    for i in 0..10 {
      assert_eq!(*q.add(i), 0x7A);
    }
  }
  heap.release(q);
}

// Property 9: release(null) is a no-op.
#[test]
fn property_release_null_is_noop() {
  let heap = fresh_heap();
  heap.release(std::ptr::null_mut());
  // The heap must still be usable afterwards.
  let p = heap.allocate(16);
  assert!(!p.is_null());
  heap.release(p);
}

// Property 10: allocate(0) always returns null.
#[test]
fn property_allocate_zero_is_null() {
  let heap = fresh_heap();
  assert!(heap.allocate(0).is_null());
}

// S1: init + single alloc/free/realloc reuses the same address.
#[test]
fn scenario_s1_init_single_alloc() {
  let heap = fresh_heap();

  let p = heap.allocate(1);
  assert!(!p.is_null());
  assert!(is_aligned(p, 16));

  heap.release(p);

  let q = heap.allocate(1);
  assert!(!q.is_null());
  assert!(is_aligned(q, 16));
  assert_eq!(p, q);
}

// S2: allocating less than a full chunk splits off a remainder that remains
// usable for a later, unrelated allocation.
#[test]
fn scenario_s2_split() {
  let heap = fresh_heap();

  let p = heap.allocate(16);
  assert!(!p.is_null());

  let q = heap.allocate(16);
  assert!(!q.is_null());
  assert_ne!(p, q, "splitting should carve distinct blocks out of one chunk");

  heap.release(p);
  heap.release(q);
}

// S3: releasing three adjacent allocations in any order coalesces them back
// into a single free region, observable as the address becoming allocatable
// again for a request spanning their combined size.
#[test]
fn scenario_s3_coalesce_both_neighbors() {
  let heap = fresh_heap();

  let a = heap.allocate(100);
  let b = heap.allocate(100);
  let c = heap.allocate(100);
  assert!(!a.is_null() && !b.is_null() && !c.is_null());

  heap.release(a);
  heap.release(c);
  heap.release(b);

  // The coalesced region must be able to satisfy a request at least as large
  // as the sum of the three released blocks' payloads, reusing the same
  // address as the first of the three.
  let combined = heap.allocate(100 * 3);
  assert_eq!(combined, a);
  heap.release(combined);
}

// S4: resize grow copies the old content and frees the old pointer.
#[test]
fn scenario_s4_resize_grow_with_copy() {
  let heap = fresh_heap();

  let p = heap.allocate(10);
  assert!(!p.is_null());
  unsafe { std::ptr::write_bytes(p, 0x41, 10) };

  let q = heap.resize(p, 100);
  assert!(!q.is_null());
  assert!(is_aligned(q, 16));
  unsafe {
    for i in 0..10 {
      assert_eq!(*q.add(i), 0x41);
    }
  }

  // `p` has been released by resize; it must be allocatable again.
  let r = heap.allocate(1);
  assert!(!r.is_null());

  heap.release(q);
  heap.release(r);
}

// S5: resize to zero frees and returns null.
#[test]
fn scenario_s5_resize_to_zero() {
  let heap = fresh_heap();

  let p = heap.allocate(64);
  assert!(!p.is_null());

  let q = heap.resize(p, 0);
  assert!(q.is_null());

  let r = heap.allocate(1);
  assert!(!r.is_null());
  heap.release(r);
}

// S6: exhausting the first chunk forces the region to grow, and allocation
// keeps succeeding across the boundary.
#[test]
fn scenario_s6_growth_triggers_extend() {
  let heap = fresh_heap();

  let mut ptrs = Vec::new();
  for _ in 0..(rallocator::CHUNK / 1024 + 8) {
    let p = heap.allocate(1024);
    assert!(!p.is_null(), "allocation should succeed across a heap extension");
    assert!(is_aligned(p, 16));
    ptrs.push(p);
  }

  for p in ptrs {
    heap.release(p);
  }
}
