use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use tracing::debug;

use crate::error::{EditError, Result};
use crate::media::codec::{EncodeSettings, MediaDecoder, MediaEncoder};
use crate::media::types::MediaBuffer;

/// In-memory codec keyed by path
///
/// Decoding looks the path up in a table of preloaded buffers; encoding
/// stores the buffer under its output path. Used to drive the editor
/// without touching ffmpeg.
#[derive(Default)]
pub struct MemoryCodec {
    sources: Mutex<HashMap<PathBuf, MediaBuffer>>,
    written: Mutex<Vec<(PathBuf, MediaBuffer, EncodeSettings)>>,
    attempts: AtomicUsize,
    /// 1-based write from which every encode fails
    fail_from: Option<usize>,
    /// Create an empty file at each output path, like ffmpeg does up front
    touch_files: bool,
}

impl MemoryCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec whose every encode call fails
    pub fn failing_writes() -> Self {
        Self::failing_from_write(1)
    }

    /// Codec whose `n`th encode call (1-based) and every later one fails
    pub fn failing_from_write(n: usize) -> Self {
        Self {
            fail_from: Some(n),
            ..Self::default()
        }
    }

    /// Also create a file on disk for every write, including failed ones
    pub fn touching_files(mut self) -> Self {
        self.touch_files = true;
        self
    }

    /// Register a buffer to be returned when `path` is decoded
    pub fn insert<P: Into<PathBuf>>(&self, path: P, buffer: MediaBuffer) {
        if let Ok(mut sources) = self.sources.lock() {
            sources.insert(path.into(), buffer);
        }
    }

    /// Every buffer written so far, in write order
    pub fn written(&self) -> Vec<(PathBuf, MediaBuffer)> {
        self.written
            .lock()
            .map(|written| {
                written
                    .iter()
                    .map(|(path, buffer, _)| (path.clone(), buffer.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Settings passed with each write, in write order
    pub fn written_settings(&self) -> Vec<EncodeSettings> {
        self.written
            .lock()
            .map(|written| written.iter().map(|(_, _, settings)| settings.clone()).collect())
            .unwrap_or_default()
    }
}

impl MediaDecoder for MemoryCodec {
    fn decode(&self, path: &Path) -> Result<MediaBuffer> {
        let sources = self
            .sources
            .lock()
            .map_err(|_| EditError::unreadable(path.display(), "source table poisoned"))?;

        sources
            .get(path)
            .cloned()
            .ok_or_else(|| EditError::unreadable(path.display(), "no such source").into())
    }
}

impl MediaEncoder for MemoryCodec {
    fn encode(&self, buffer: &MediaBuffer, path: &Path, settings: &EncodeSettings) -> Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if self.touch_files {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::File::create(path)?;
        }
        if self.fail_from.is_some_and(|n| attempt >= n) {
            return Err(EditError::encode_fault(path.display(), format!("write {} disabled", attempt)).into());
        }

        debug!("Storing {} frames for {:?}", buffer.frame_count(), path);
        let mut written = self
            .written
            .lock()
            .map_err(|_| EditError::encode_fault(path.display(), "write log poisoned"))?;
        written.push((path.to_path_buf(), buffer.clone(), settings.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_unknown_path_is_unreadable() {
        let codec = MemoryCodec::new();
        let err = codec.decode(Path::new("missing.mp4")).unwrap_err();
        assert!(matches!(err.as_edit(), Some(EditError::MediaUnreadable { .. })));
    }

    #[test]
    fn test_roundtrip_through_table() {
        let codec = MemoryCodec::new();
        let buffer = MediaBuffer::solid(2, 2, 5.0, 3, [10, 20, 30]).unwrap();
        codec.insert("clip.mp4", buffer.clone());

        let decoded = codec.decode(Path::new("clip.mp4")).unwrap();
        codec
            .encode(&decoded, Path::new("out.mp4"), &EncodeSettings::default())
            .unwrap();

        let written = codec.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, PathBuf::from("out.mp4"));
        assert_eq!(written[0].1, buffer);
    }

    #[test]
    fn test_failing_writes() {
        let codec = MemoryCodec::failing_writes();
        let buffer = MediaBuffer::solid(2, 2, 5.0, 1, [0, 0, 0]).unwrap();
        let err = codec
            .encode(&buffer, Path::new("out.mp4"), &EncodeSettings::default())
            .unwrap_err();
        assert!(matches!(err.as_edit(), Some(EditError::EncodeFault { .. })));
        assert!(codec.written().is_empty());
    }

    #[test]
    fn test_failing_from_later_write() {
        let dir = tempfile::tempdir().unwrap();
        let codec = MemoryCodec::failing_from_write(2).touching_files();
        let buffer = MediaBuffer::solid(2, 2, 5.0, 1, [0, 0, 0]).unwrap();
        let settings = EncodeSettings::default();

        codec.encode(&buffer, &dir.path().join("a.mp4"), &settings).unwrap();
        assert!(codec.encode(&buffer, &dir.path().join("b.mp4"), &settings).is_err());

        assert_eq!(codec.written().len(), 1);
        assert!(dir.path().join("a.mp4").exists());
        assert!(dir.path().join("b.mp4").exists());
    }
}
