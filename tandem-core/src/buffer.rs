//! Message buffers
//!
//! Two ownership disciplines travel through the engine and they are kept
//! as separate types:
//!
//! - [`BorrowedBuffer`]: the caller's bytes for a send. The engine only
//!   reads them, and the borrow keeps the caller from touching them until
//!   the engine is done.
//! - [`SharedBuffer`]: a reference-counted buffer the engine allocates for
//!   each receive. The engine fills it while it holds the only reference,
//!   hands a reference to the receive handler and drops its own, so the
//!   allocation lives exactly as long as the application keeps it.

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;
use core::ops::Deref;

use crate::config::DEFAULT_MAX_MESSAGE_LEN;

/// Errors from receive buffer allocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AllocError {
    /// Requested length is above the allocator's limit
    TooLarge { requested: usize, limit: usize },
    /// The heap could not satisfy the request
    OutOfMemory,
}

/// Read-only view of a caller-owned send buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowedBuffer<'a> {
    data: &'a [u8],
}

impl<'a> BorrowedBuffer<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub const fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    pub const fn len(&self) -> usize {
        self.data.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<'a> From<&'a [u8]> for BorrowedBuffer<'a> {
    fn from(data: &'a [u8]) -> Self {
        Self::new(data)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for BorrowedBuffer<'a> {
    fn from(data: &'a [u8; N]) -> Self {
        Self::new(data)
    }
}

impl Deref for BorrowedBuffer<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.data
    }
}

/// Reference-counted receive buffer
///
/// Cloning adds a reference to the same allocation. Not `Send`: receive
/// buffers stay on the executor that runs the engine.
#[derive(Clone)]
pub struct SharedBuffer {
    data: Rc<Vec<u8>>,
}

impl SharedBuffer {
    /// Allocate `len` zeroed bytes, reporting exhaustion instead of aborting
    pub fn try_zeroed(len: usize) -> Result<Self, AllocError> {
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| AllocError::OutOfMemory)?;
        data.resize(len, 0);
        Ok(Self {
            data: Rc::new(data),
        })
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable access, only while this is the sole reference
    pub fn get_mut(&mut self) -> Option<&mut [u8]> {
        Rc::get_mut(&mut self.data).map(|v| v.as_mut_slice())
    }

    /// Number of live references to the allocation
    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.data)
    }

    /// Check if two handles share one allocation
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.data, &b.data)
    }
}

impl Deref for SharedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl AsRef<[u8]> for SharedBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("len", &self.data.len())
            .field("refs", &self.ref_count())
            .finish()
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for SharedBuffer {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "SharedBuffer({} bytes)", self.data.len());
    }
}

/// Source of receive buffers
pub trait BufferAllocator {
    /// Allocate a zeroed buffer of exactly `len` bytes
    fn allocate(&mut self, len: usize) -> Result<SharedBuffer, AllocError>;
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for &mut A {
    fn allocate(&mut self, len: usize) -> Result<SharedBuffer, AllocError> {
        (**self).allocate(len)
    }
}

/// Global-heap allocator with an upper size bound
#[derive(Debug, Clone, Copy)]
pub struct HeapAllocator {
    limit: usize,
}

impl HeapAllocator {
    pub const fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl Default for HeapAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_LEN as usize)
    }
}

impl BufferAllocator for HeapAllocator {
    fn allocate(&mut self, len: usize) -> Result<SharedBuffer, AllocError> {
        if len > self.limit {
            return Err(AllocError::TooLarge {
                requested: len,
                limit: self.limit,
            });
        }
        SharedBuffer::try_zeroed(len)
    }
}
