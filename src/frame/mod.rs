//! Compressed packets, decoded frames and format descriptors
//!
//! `CodecPacket` is the compressed unit handed to a decoder adapter;
//! `MediaFrame` is the decoded unit produced by an adapter or the
//! resampler. A frame owns up to four planes of shared backing storage
//! and exactly one of an audio or video geometry.

mod buffer;

pub use buffer::{BufferHandle, HeapBuffer, NativeBuffer};

use crate::time::MediaTime;

/// Maximum number of data planes a frame can carry
pub const MAX_PLANES: usize = 4;

/// Codec identifiers understood by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodecId {
    /// H.264 / AVC video
    H264,

    /// H.265 / HEVC video
    Hevc,

    /// AAC audio
    Aac,

    /// Uncompressed PCM audio
    Pcm,
}

impl CodecId {
    /// Whether this codec carries audio
    pub fn is_audio(&self) -> bool {
        matches!(self, CodecId::Aac | CodecId::Pcm)
    }

    /// Whether the codec requires out-of-band configuration bytes
    /// (sequence headers) before packets can be decoded
    pub fn requires_extradata(&self) -> bool {
        matches!(self, CodecId::H264 | CodecId::Hevc | CodecId::Aac)
    }
}

/// Audio sample formats understood by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Unsigned 8-bit
    U8,

    /// Signed 16-bit
    S16,

    /// Signed 32-bit
    S32,

    /// 32-bit float
    F32,

    /// 64-bit float
    F64,
}

impl SampleFormat {
    /// Size of one sample in bytes
    pub fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::S16 => 2,
            SampleFormat::S32 | SampleFormat::F32 => 4,
            SampleFormat::F64 => 8,
        }
    }
}

/// Pixel formats understood by the core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// Planar 4:2:0 YUV
    Yuv420p,

    /// Y plane + interleaved UV plane
    Nv12,

    /// Packed 8-bit BGRA
    Bgra,
}

/// Packet flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PacketFlags {
    /// Sync point / keyframe
    pub sync: bool,

    /// Not used as a reference; the decoder may discard it without
    /// affecting later frames
    pub disposable: bool,
}

/// A compressed audio or video unit
///
/// Produced by a demuxer, exclusively owned by the caller until passed
/// into a `DecoderAdapter`. The adapter retains nothing past the call
/// that consumes it except the dts, which is cloned into its timestamp
/// FIFO.
#[derive(Debug, Clone)]
pub struct CodecPacket {
    /// Compressed bytes
    pub data: Vec<u8>,

    /// Monotonic 0-based sample/frame index
    pub index: u64,

    /// Codec of the stream this packet belongs to
    pub format: CodecId,

    /// Sync/disposable markers
    pub flags: PacketFlags,

    /// Decode timestamp
    pub dts: MediaTime,

    /// Presentation timestamp
    pub pts: MediaTime,
}

impl CodecPacket {
    /// Packet size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Frame geometry: exactly one of audio or video per frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameLayout {
    /// Decoded audio geometry
    Audio {
        /// Numeric sample format
        sample_format: SampleFormat,

        /// Channel count
        channels: usize,

        /// Samples per second
        sample_rate: u32,

        /// Samples per channel in this frame
        samples: usize,
    },

    /// Decoded video geometry
    Video {
        /// Pixel format
        pixel_format: PixelFormat,

        /// Visible width in pixels
        width: u32,

        /// Visible height in pixels
        height: u32,

        /// Bytes per row of the first plane
        stride: usize,

        /// Allocated rows per plane (>= height)
        slice_height: u32,
    },
}

/// A decoded audio or video unit
///
/// Planes are shared handles so a frame backed by a platform-native
/// surface releases the surface when the last holder drops it. Once an
/// adapter hands a frame to the caller the caller owns it exclusively.
#[derive(Clone)]
pub struct MediaFrame {
    /// Backing planes; unused slots are `None`
    planes: [Option<BufferHandle>; MAX_PLANES],

    /// Audio or video geometry
    pub layout: FrameLayout,

    /// Presentation timestamp
    pub pts: MediaTime,

    /// Presentation duration
    pub duration: MediaTime,
}

impl MediaFrame {
    /// Create a frame from its planes and geometry
    pub fn new(
        planes: Vec<BufferHandle>,
        layout: FrameLayout,
        pts: MediaTime,
        duration: MediaTime,
    ) -> crate::utils::error::Result<Self> {
        if planes.is_empty() || planes.len() > MAX_PLANES {
            return Err(crate::utils::error::MediaCoreError::BadParameter(format!(
                "Frame must carry 1..={} planes, got {}",
                MAX_PLANES,
                planes.len()
            )));
        }

        let mut slots: [Option<BufferHandle>; MAX_PLANES] = [None, None, None, None];
        for (slot, plane) in slots.iter_mut().zip(planes) {
            *slot = Some(plane);
        }

        Ok(Self { planes: slots, layout, pts, duration })
    }

    /// Number of populated planes
    pub fn plane_count(&self) -> usize {
        self.planes.iter().filter(|p| p.is_some()).count()
    }

    /// Bytes of plane `index`, if populated
    pub fn plane(&self, index: usize) -> Option<&[u8]> {
        self.planes.get(index)?.as_ref().map(|p| p.data())
    }

    /// Shared handle of plane `index`, if populated
    pub fn plane_handle(&self, index: usize) -> Option<BufferHandle> {
        self.planes.get(index)?.clone()
    }

    /// Whether the frame carries audio
    pub fn is_audio(&self) -> bool {
        matches!(self.layout, FrameLayout::Audio { .. })
    }

    /// Samples per channel for audio frames, 0 for video
    pub fn sample_count(&self) -> usize {
        match self.layout {
            FrameLayout::Audio { samples, .. } => samples,
            FrameLayout::Video { .. } => 0,
        }
    }
}

impl std::fmt::Debug for MediaFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaFrame")
            .field("planes", &self.plane_count())
            .field("layout", &self.layout)
            .field("pts", &self.pts)
            .field("duration", &self.duration)
            .finish()
    }
}
