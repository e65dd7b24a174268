use std::fmt;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{EditError, EditorError, Result};
use crate::media::{AudioTrack, Frame, MediaBuffer};
use crate::pipeline::{stages, validator};

/// Named output resolutions for the resolution-change entry point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    #[serde(rename = "480p")]
    P480,
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "1440p")]
    P1440,
    #[serde(rename = "4K")]
    Uhd4k,
}

impl Quality {
    pub const ALL: [Quality; 5] = [Self::P480, Self::P720, Self::P1080, Self::P1440, Self::Uhd4k];

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::P480 => (854, 480),
            Self::P720 => (1280, 720),
            Self::P1080 => (1920, 1080),
            Self::P1440 => (2560, 1440),
            Self::Uhd4k => (3840, 2160),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::P480 => "480p",
            Self::P720 => "720p",
            Self::P1080 => "1080p",
            Self::P1440 => "1440p",
            Self::Uhd4k => "4K",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Quality {
    type Err = EditError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|quality| quality.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| EditError::UnknownOption {
                option: s.to_string(),
            })
    }
}

/// Resize every frame to the exact pixel size of `quality`
///
/// Aspect ratio is not preserved.
pub fn change_resolution(buffer: MediaBuffer, quality: Quality) -> MediaBuffer {
    let (width, height) = quality.dimensions();
    info!(
        "Changing resolution {}x{} -> {} ({}x{})",
        buffer.width(),
        buffer.height(),
        quality,
        width,
        height
    );
    stages::resize_frames(buffer, width, height)
}

/// Cut several independent segments out of one buffer
///
/// Every range is validated before any segment is produced; one bad range
/// fails the whole call. Ranges may overlap.
pub fn cut_segments(buffer: &MediaBuffer, ranges: &[(f64, f64)]) -> Result<Vec<MediaBuffer>> {
    let duration = buffer.duration();
    for &(start, end) in ranges {
        validator::validate_range("cut", start, end, duration)?;
    }

    let segments = ranges
        .iter()
        .map(|&(start, end)| {
            let (first, last) = stages::trim_bounds(buffer.frame_count(), buffer.fps(), start, end);
            debug!("Cut {:.2}s-{:.2}s -> frames {}..{}", start, end, first, last);
            let audio = buffer
                .audio()
                .map(|track| track.slice(first as f64 / buffer.fps(), last as f64 / buffer.fps()));
            MediaBuffer::from_parts(buffer.frames()[first..last].to_vec(), buffer.fps(), audio)
        })
        .collect();

    Ok(segments)
}

/// Unwrap a list of optional inputs, failing if any one is absent
pub fn require_all<'a, T>(inputs: &'a [Option<T>], what: &str) -> Result<Vec<&'a T>> {
    if inputs.is_empty() {
        return Err(EditError::missing(what).into());
    }
    inputs
        .iter()
        .map(|input| input.as_ref().ok_or_else(|| EditorError::from(EditError::missing(what))))
        .collect()
}

/// Concatenate buffers in order
///
/// The first input sets the geometry and frame rate. Other inputs are
/// letterboxed and rate-converted by nearest frame to match. If any input
/// carries audio, inputs without it contribute silence.
pub fn merge(inputs: Vec<MediaBuffer>) -> Result<MediaBuffer> {
    let Some(first) = inputs.first() else {
        return Err(EditError::missing("at least one video to merge").into());
    };
    let (width, height, fps) = (first.width(), first.height(), first.fps());
    let audio_format = inputs
        .iter()
        .find_map(|input| input.audio())
        .map(|track| (track.sample_rate, track.channels));

    info!("Merging {} inputs into {}x{} @ {:.2} fps", inputs.len(), width, height, fps);

    let mut frames = Vec::new();
    let mut samples = Vec::new();

    for (index, input) in inputs.into_iter().enumerate() {
        let duration = input.duration();
        let conformed = conform(input, width, height, fps, index);

        if let Some((rate, channels)) = audio_format {
            let track = matching_audio(conformed.audio(), conformed.duration(), rate, channels, index);
            samples.extend(track.samples);
        }
        debug!("Input {} contributes {:.2}s ({} frames)", index, duration, conformed.frame_count());

        let (input_frames, _, _) = conformed.into_parts();
        frames.extend(input_frames);
    }

    let audio = audio_format.map(|(rate, channels)| AudioTrack::new(samples, rate, channels));
    Ok(MediaBuffer::from_parts(frames, fps, audio))
}

/// Bring one merge input to the target geometry and frame rate
fn conform(mut input: MediaBuffer, width: u32, height: u32, fps: f64, index: usize) -> MediaBuffer {
    if (input.width(), input.height()) != (width, height) {
        warn!(
            "Merge input {} is {}x{}, letterboxing into {}x{}",
            index,
            input.width(),
            input.height(),
            width,
            height
        );
        let (mut frames, source_fps, audio) = input.into_parts();
        frames
            .par_iter_mut()
            .for_each(|frame| *frame = letterbox(frame, width, height));
        input = MediaBuffer::from_parts(frames, source_fps, audio);
    }

    if (input.fps() - fps).abs() > f64::EPSILON {
        warn!("Merge input {} runs at {:.2} fps, converting to {:.2} fps", index, input.fps(), fps);
        input = convert_rate(input, fps);
    }

    input
}

/// Scale to fit inside `width` x `height` and center on black
fn letterbox(frame: &Frame, width: u32, height: u32) -> Frame {
    let scale = f64::min(
        width as f64 / frame.width() as f64,
        height as f64 / frame.height() as f64,
    );
    let fit_w = ((frame.width() as f64 * scale).round() as u32).clamp(1, width);
    let fit_h = ((frame.height() as f64 * scale).round() as u32).clamp(1, height);

    let scaled = imageops::resize(frame.as_image(), fit_w, fit_h, FilterType::Lanczos3);
    let mut canvas = Frame::new_black(width, height);
    imageops::replace(
        canvas.as_image_mut(),
        &scaled,
        ((width - fit_w) / 2) as i64,
        ((height - fit_h) / 2) as i64,
    );
    canvas
}

/// Nearest-frame resampling to a new frame rate, keeping the duration
fn convert_rate(input: MediaBuffer, fps: f64) -> MediaBuffer {
    let (frames, source_fps, audio) = input.into_parts();
    let count = ((frames.len() as f64 / source_fps * fps).round() as usize).max(1);
    let last = frames.len() - 1;

    let converted = (0..count)
        .map(|i| {
            let source = (i as f64 / fps * source_fps).round() as usize;
            frames[source.min(last)].clone()
        })
        .collect();
    MediaBuffer::from_parts(converted, fps, audio)
}

/// Audio for one merge input, padded or cut to exactly `duration`
fn matching_audio(
    track: Option<&AudioTrack>,
    duration: f64,
    rate: u32,
    channels: u16,
    index: usize,
) -> AudioTrack {
    let expected = (duration * rate as f64).round() as usize * channels as usize;

    let mut samples = match track {
        Some(track) if track.sample_rate == rate && track.channels == channels => track.samples.clone(),
        Some(track) => {
            warn!(
                "Merge input {} audio is {} Hz x{}, expected {} Hz x{}; using silence",
                index, track.sample_rate, track.channels, rate, channels
            );
            Vec::new()
        }
        None => {
            debug!("Merge input {} has no audio, padding with silence", index);
            Vec::new()
        }
    };

    samples.resize(expected, 0.0);
    AudioTrack::new(samples, rate, channels)
}
