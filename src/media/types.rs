use image::{ImageBuffer, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};

/// A single decoded RGB frame
///
/// Thin wrapper around an RGB image buffer with the pixel helpers the
/// transform stages need.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    buffer: RgbImage,
}

impl Frame {
    /// Create a new frame from an RGB image buffer
    pub fn new(buffer: RgbImage) -> Self {
        Self { buffer }
    }

    /// Create a new frame with the given dimensions filled with black
    pub fn new_black(width: u32, height: u32) -> Self {
        Self {
            buffer: ImageBuffer::new(width, height),
        }
    }

    /// Create a new frame with the given dimensions filled with the specified color
    pub fn new_filled(width: u32, height: u32, color: [u8; 3]) -> Self {
        let buffer = ImageBuffer::from_pixel(width, height, Rgb(color));
        Self { buffer }
    }

    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.buffer.dimensions()
    }

    /// Get a pixel at the given coordinates (returns RGB array)
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buffer.get_pixel(x, y).0
    }

    /// Set a pixel at the given coordinates
    pub fn set_pixel(&mut self, x: u32, y: u32, color: [u8; 3]) {
        self.buffer.put_pixel(x, y, Rgb(color));
    }

    /// Apply `f` to every channel value in place
    pub fn map_channels<F: Fn(u8) -> u8>(&mut self, f: F) {
        for value in self.buffer.iter_mut() {
            *value = f(*value);
        }
    }

    /// Apply `f` to every pixel in place
    pub fn map_pixels<F: Fn([u8; 3]) -> [u8; 3]>(&mut self, f: F) {
        for pixel in self.buffer.pixels_mut() {
            pixel.0 = f(pixel.0);
        }
    }

    pub fn as_image(&self) -> &RgbImage {
        &self.buffer
    }

    pub fn as_image_mut(&mut self) -> &mut RgbImage {
        &mut self.buffer
    }

    /// Raw interleaved RGB bytes
    pub fn as_rgb_bytes(&self) -> &[u8] {
        self.buffer.as_raw()
    }

    /// Create a frame from raw RGB bytes
    pub fn from_rgb_bytes(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        ImageBuffer::from_raw(width, height, data).map(|buffer| Self { buffer })
    }
}

/// Interleaved PCM audio carried alongside the video frames
#[derive(Clone, Debug, PartialEq)]
pub struct AudioTrack {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioTrack {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn silence(duration: f64, sample_rate: u32, channels: u16) -> Self {
        let count = (duration * sample_rate as f64).round() as usize * channels as usize;
        Self::new(vec![0.0; count], sample_rate, channels)
    }

    /// Number of sample frames (one sample per channel)
    pub fn sample_frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }

    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_frames() as f64 / self.sample_rate as f64
    }

    /// Samples covering `[start, end)` seconds, clamped to the track
    pub fn slice(&self, start: f64, end: f64) -> Self {
        let total = self.sample_frames();
        let channels = self.channels as usize;
        let first = ((start * self.sample_rate as f64).round() as usize).min(total);
        let last = ((end * self.sample_rate as f64).round() as usize).clamp(first, total);

        Self::new(
            self.samples[first * channels..last * channels].to_vec(),
            self.sample_rate,
            self.channels,
        )
    }

    /// Time-remap the track so it plays `factor` times faster
    pub fn retimed(&self, factor: f64) -> Self {
        let total = self.sample_frames();
        let channels = self.channels as usize;
        let target = (total as f64 / factor).round() as usize;
        let mut samples = Vec::with_capacity(target * channels);

        for i in 0..target {
            let source = ((i as f64 * factor) as usize).min(total.saturating_sub(1));
            samples.extend_from_slice(&self.samples[source * channels..(source + 1) * channels]);
        }

        Self::new(samples, self.sample_rate, self.channels)
    }

    /// Reverse playback order, keeping channel interleaving intact
    pub fn reversed(&self) -> Self {
        let channels = (self.channels as usize).max(1);
        let samples = self
            .samples
            .chunks(channels)
            .rev()
            .flatten()
            .copied()
            .collect();
        Self::new(samples, self.sample_rate, self.channels)
    }
}

/// Snapshot of the properties the validator reasons about
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BufferProps {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Decoded media owned by exactly one pipeline invocation
///
/// Stages take the buffer by value and hand back a new one, so a buffer is
/// never observed half-transformed.
#[derive(Clone, Debug, PartialEq)]
pub struct MediaBuffer {
    frames: Vec<Frame>,
    fps: f64,
    audio: Option<AudioTrack>,
}

impl MediaBuffer {
    /// Build a buffer, checking that it has frames of one size and a usable rate
    pub fn new(frames: Vec<Frame>, fps: f64) -> Result<Self> {
        if !(fps.is_finite() && fps > 0.0) {
            return Err(EditError::invalid_parameter("buffer", format!("frame rate {} must be positive", fps)).into());
        }

        let Some(first) = frames.first() else {
            return Err(EditError::invalid_parameter("buffer", "buffer has no frames").into());
        };

        let (width, height) = first.dimensions();
        if width == 0 || height == 0 {
            return Err(EditError::invalid_parameter("buffer", "frame dimensions must be non-zero").into());
        }
        if frames.iter().any(|frame| frame.dimensions() != (width, height)) {
            return Err(EditError::invalid_parameter("buffer", "all frames must share the same dimensions").into());
        }

        Ok(Self {
            frames,
            fps,
            audio: None,
        })
    }

    /// Solid-color buffer, mostly useful for tests and placeholders
    pub fn solid(width: u32, height: u32, fps: f64, frame_count: usize, color: [u8; 3]) -> Result<Self> {
        Self::new(vec![Frame::new_filled(width, height, color); frame_count], fps)
    }

    pub fn with_audio(mut self, audio: AudioTrack) -> Self {
        self.audio = Some(audio);
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn audio(&self) -> Option<&AudioTrack> {
        self.audio.as_ref()
    }

    pub fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    pub fn width(&self) -> u32 {
        self.frames[0].width()
    }

    pub fn height(&self) -> u32 {
        self.frames[0].height()
    }

    pub fn props(&self) -> BufferProps {
        BufferProps {
            duration: self.duration(),
            width: self.width(),
            height: self.height(),
            fps: self.fps,
        }
    }

    /// Split into parts for stages that rebuild the buffer
    pub fn into_parts(self) -> (Vec<Frame>, f64, Option<AudioTrack>) {
        (self.frames, self.fps, self.audio)
    }

    /// Reassemble after a stage; stages keep frames uniform and non-empty
    pub(crate) fn from_parts(frames: Vec<Frame>, fps: f64, audio: Option<AudioTrack>) -> Self {
        debug_assert!(!frames.is_empty());
        Self { frames, fps, audio }
    }
}
