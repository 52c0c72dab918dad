//! Static cross-reference tables between core enums and engine tags
//!
//! Decode engines identify codecs and formats by four-character tags.
//! The tables here are built once at first use and queried through pure
//! functions; a missing mapping is a configuration error surfaced at
//! adapter construction, never a runtime state issue.

use crate::frame::{CodecId, PixelFormat, SampleFormat};
use crate::utils::error::{MediaCoreError, Result};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// CodecId <-> engine codec tag
static CODEC_TAGS: Lazy<MappingTable<CodecId>> = Lazy::new(|| {
    MappingTable::new(&[
        (CodecId::H264, "avc1"),
        (CodecId::Hevc, "hvc1"),
        (CodecId::Aac, "mp4a"),
        (CodecId::Pcm, "lpcm"),
    ])
});

/// SampleFormat <-> engine sample tag
static SAMPLE_TAGS: Lazy<MappingTable<SampleFormat>> = Lazy::new(|| {
    MappingTable::new(&[
        (SampleFormat::U8, "raw8"),
        (SampleFormat::S16, "sw16"),
        (SampleFormat::S32, "sw32"),
        (SampleFormat::F32, "fl32"),
        (SampleFormat::F64, "fl64"),
    ])
});

/// PixelFormat <-> engine pixel tag
static PIXEL_TAGS: Lazy<MappingTable<PixelFormat>> = Lazy::new(|| {
    MappingTable::new(&[
        (PixelFormat::Yuv420p, "y420"),
        (PixelFormat::Nv12, "420v"),
        (PixelFormat::Bgra, "bgra"),
    ])
});

/// Bidirectional map between a core enum and engine tags
struct MappingTable<T: Copy + Eq + std::hash::Hash + 'static> {
    forward: HashMap<T, &'static str>,
    reverse: HashMap<&'static str, T>,
}

impl<T: Copy + Eq + std::hash::Hash + 'static> MappingTable<T> {
    fn new(pairs: &[(T, &'static str)]) -> Self {
        let forward = pairs.iter().copied().collect();
        let reverse = pairs.iter().map(|&(value, tag)| (tag, value)).collect();
        Self { forward, reverse }
    }
}

/// Engine tag for a codec
pub fn codec_tag(codec: CodecId) -> Result<&'static str> {
    CODEC_TAGS
        .forward
        .get(&codec)
        .copied()
        .ok_or_else(|| MediaCoreError::UnsupportedFormat(format!("No engine tag for {:?}", codec)))
}

/// Codec for an engine tag
pub fn codec_from_tag(tag: &str) -> Result<CodecId> {
    CODEC_TAGS
        .reverse
        .get(tag)
        .copied()
        .ok_or_else(|| MediaCoreError::UnsupportedFormat(format!("Unknown codec tag '{}'", tag)))
}

/// Engine tag for a sample format
pub fn sample_tag(format: SampleFormat) -> Result<&'static str> {
    SAMPLE_TAGS
        .forward
        .get(&format)
        .copied()
        .ok_or_else(|| MediaCoreError::UnsupportedFormat(format!("No engine tag for {:?}", format)))
}

/// Sample format for an engine tag
pub fn sample_from_tag(tag: &str) -> Result<SampleFormat> {
    SAMPLE_TAGS
        .reverse
        .get(tag)
        .copied()
        .ok_or_else(|| MediaCoreError::UnsupportedFormat(format!("Unknown sample tag '{}'", tag)))
}

/// Engine tag for a pixel format
pub fn pixel_tag(format: PixelFormat) -> Result<&'static str> {
    PIXEL_TAGS
        .forward
        .get(&format)
        .copied()
        .ok_or_else(|| MediaCoreError::UnsupportedFormat(format!("No engine tag for {:?}", format)))
}

/// Pixel format for an engine tag
pub fn pixel_from_tag(tag: &str) -> Result<PixelFormat> {
    PIXEL_TAGS
        .reverse
        .get(tag)
        .copied()
        .ok_or_else(|| MediaCoreError::UnsupportedFormat(format!("Unknown pixel tag '{}'", tag)))
}
