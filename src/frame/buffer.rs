//! Shared-ownership backing buffers for frame planes
//!
//! Decoded frames may be backed by plain heap memory (software decode,
//! resampler output) or by platform-native surfaces owned by a hardware
//! decode session. Both are reached through the `NativeBuffer` capability
//! trait behind an `Arc`, so a plane lives until its last holder drops it
//! and native handles release in their `Drop` impl.

use std::sync::Arc;

/// Capability interface for a frame plane's backing store
pub trait NativeBuffer: Send + Sync {
    /// Raw bytes of the plane
    fn data(&self) -> &[u8];

    /// Plane size in bytes
    fn len(&self) -> usize {
        self.data().len()
    }

    /// Whether the plane holds no bytes
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared handle to a plane's backing store
pub type BufferHandle = Arc<dyn NativeBuffer>;

/// Heap-allocated backing store for software-produced planes
pub struct HeapBuffer {
    data: Vec<u8>,
}

impl HeapBuffer {
    /// Wrap a byte vector as a shared plane handle
    pub fn new(data: Vec<u8>) -> BufferHandle {
        Arc::new(Self { data })
    }

    /// Allocate a zeroed plane of `len` bytes
    pub fn zeroed(len: usize) -> BufferHandle {
        Self::new(vec![0u8; len])
    }
}

impl NativeBuffer for HeapBuffer {
    fn data(&self) -> &[u8] {
        &self.data
    }
}
