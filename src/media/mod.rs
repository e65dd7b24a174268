//! # Media Module
//!
//! Decoded media buffers and the decode/encode collaborators that produce and
//! consume them.

pub mod codec;
pub mod ffmpeg;
pub mod memory;
pub mod types;

pub use codec::{EncodeSettings, MediaCodec, MediaDecoder, MediaEncoder};
pub use ffmpeg::{FfmpegCodec, MediaInfo};
pub use memory::MemoryCodec;
pub use types::{AudioTrack, BufferProps, Frame, MediaBuffer};
