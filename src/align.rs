//! Alignment macros shared by the rest of the crate.

/// Rounds `$value` up to the nearest multiple of the machine word size.
///
/// # Examples
///
/// ```rust
/// use std::mem;
/// use rallocator::align;
///
/// match mem::size_of::<usize>() {
///     8 => assert_eq!(align!(13), 16), // 64 bit machine.
///     4 => assert_eq!(align!(11), 12), // 32 bit machine.
///     _ => {},
/// };
/// ```
#[macro_export]
macro_rules! align {
  ($value:expr) => {
    ($value + ::std::mem::size_of::<usize>() - 1) & !(::std::mem::size_of::<usize>() - 1)
  };
}

/// Rounds `$value` up to the nearest multiple of `$align`, which must be a
/// power of two.
///
/// # Examples
///
/// ```rust
/// use rallocator::align_to;
///
/// assert_eq!(align_to!(17, 16), 32);
/// assert_eq!(align_to!(32, 16), 32);
/// ```
#[macro_export]
macro_rules! align_to {
  ($value:expr, $align:expr) => {
    ($value + $align - 1) & !($align - 1)
  };
}
