use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{error::Result, media::types::MediaBuffer};

/// Something that can turn an encoded asset on disk into a [`MediaBuffer`]
///
/// Implementations report every failure as `EditError::MediaUnreadable`.
pub trait MediaDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<MediaBuffer>;
}

/// Something that can write a [`MediaBuffer`] to disk
///
/// Implementations report every failure as `EditError::EncodeFault`.
pub trait MediaEncoder: Send + Sync {
    fn encode(&self, buffer: &MediaBuffer, path: &Path, settings: &EncodeSettings) -> Result<()>;
}

/// A collaborator that can both read and write media
pub trait MediaCodec: MediaDecoder + MediaEncoder {}

impl<T: MediaDecoder + MediaEncoder> MediaCodec for T {}

/// Output codec configuration for video writes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodeSettings {
    /// Video encoder name as understood by ffmpeg
    pub video_codec: String,

    /// Audio encoder name as understood by ffmpeg
    pub audio_codec: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            quality: 85,
        }
    }
}

impl EncodeSettings {
    /// Map the 0-100 quality scale onto x264's CRF (0 best, 51 worst)
    pub fn crf(&self) -> u8 {
        (51 - ((self.quality.min(100) as f32 / 100.0) * 51.0) as u8).min(51)
    }
}
