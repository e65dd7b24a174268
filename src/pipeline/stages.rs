use image::imageops::{self, FilterType};
use rayon::prelude::*;

use crate::directive::Operation;
use crate::imaging::kernels::{self, clamp_channel};
use crate::media::{Frame, MediaBuffer};

/// Mid-gray pivot for contrast adjustments
const CONTRAST_PIVOT: f32 = 127.0;

/// Apply one already-validated operation
///
/// Consumes the buffer and returns the transformed one. Callers validate
/// the operation first; out-of-range values are clamped here rather than
/// rejected, and a border too large to represent leaves the buffer as is.
pub fn apply_operation(buffer: MediaBuffer, op: &Operation) -> MediaBuffer {
    match *op {
        Operation::Trim { start, end } => trim(buffer, start, end),
        Operation::Grayscale => map_frames(buffer, kernels::grayscale),
        Operation::SpeedChange { factor } => change_speed(buffer, factor),
        Operation::Rotate { angle } => map_frames(buffer, move |frame| rotate_ccw(frame, angle)),
        Operation::FlipHorizontal => map_frames(buffer, |frame| imageops::flip_horizontal_in_place(frame.as_image_mut())),
        Operation::FlipVertical => map_frames(buffer, |frame| imageops::flip_vertical_in_place(frame.as_image_mut())),
        Operation::FadeIn { seconds } => fade(buffer, seconds, FadeDirection::In),
        Operation::FadeOut { seconds } => fade(buffer, seconds, FadeDirection::Out),
        Operation::BrightnessAdjust { delta } => {
            let gain = 1.0 + delta as f32;
            map_frames(buffer, move |frame| frame.map_channels(|v| clamp_channel(v as f32 * gain)))
        }
        Operation::ContrastAdjust { delta } => {
            let delta = delta as f32;
            map_frames(buffer, move |frame| {
                frame.map_channels(|v| clamp_channel(v as f32 + delta * (v as f32 - CONTRAST_PIVOT)))
            })
        }
        Operation::Reverse => reverse(buffer),
        Operation::Resize { percent } => {
            let (width, height) = scaled_dimensions(buffer.width(), buffer.height(), percent);
            resize_frames(buffer, width, height)
        }
        Operation::Border { size_px } => match bordered_dimensions(buffer.width(), buffer.height(), size_px) {
            Some((width, height)) => map_frames(buffer, move |frame| *frame = with_border(frame, width, height, size_px)),
            None => buffer,
        },
    }
}

/// Run `f` on every frame in parallel
fn map_frames<F>(buffer: MediaBuffer, f: F) -> MediaBuffer
where
    F: Fn(&mut Frame) + Sync + Send,
{
    let (mut frames, fps, audio) = buffer.into_parts();
    frames.par_iter_mut().for_each(|frame| f(frame));
    MediaBuffer::from_parts(frames, fps, audio)
}

/// Frame index range `[first, last)` kept by a trim
///
/// Always keeps at least one frame.
pub fn trim_bounds(frame_count: usize, fps: f64, start: f64, end: f64) -> (usize, usize) {
    let to_index = |seconds: f64| (seconds * fps).round().max(0.0) as usize;
    let first = to_index(start).min(frame_count.saturating_sub(1));
    let last = to_index(end).clamp(first + 1, frame_count.max(first + 1));
    (first, last)
}

pub fn trim(buffer: MediaBuffer, start: f64, end: f64) -> MediaBuffer {
    let (first, last) = trim_bounds(buffer.frame_count(), buffer.fps(), start, end);
    let (frames, fps, audio) = buffer.into_parts();

    let frames = frames.into_iter().skip(first).take(last - first).collect();
    let audio = audio.map(|track| track.slice(first as f64 / fps, last as f64 / fps));
    MediaBuffer::from_parts(frames, fps, audio)
}

/// Frame count after playing `frame_count` frames `factor` times faster
pub fn retimed_frame_count(frame_count: usize, factor: f64) -> usize {
    ((frame_count as f64 / factor).round() as usize).max(1)
}

fn change_speed(buffer: MediaBuffer, factor: f64) -> MediaBuffer {
    let (frames, fps, audio) = buffer.into_parts();
    let count = retimed_frame_count(frames.len(), factor);
    let last = frames.len() - 1;

    let retimed = (0..count)
        .map(|i| frames[((i as f64 * factor) as usize).min(last)].clone())
        .collect();
    let audio = audio.map(|track| track.retimed(factor));
    MediaBuffer::from_parts(retimed, fps, audio)
}

/// Counter-clockwise rotation by a right angle
fn rotate_ccw(frame: &mut Frame, angle: u32) {
    let rotated = match angle {
        90 => imageops::rotate270(frame.as_image()),
        180 => imageops::rotate180(frame.as_image()),
        270 => imageops::rotate90(frame.as_image()),
        _ => return,
    };
    *frame = Frame::new(rotated);
}

#[derive(Debug, Clone, Copy)]
enum FadeDirection {
    In,
    Out,
}

fn fade(buffer: MediaBuffer, seconds: f64, direction: FadeDirection) -> MediaBuffer {
    if seconds <= 0.0 {
        return buffer;
    }

    let duration = buffer.duration();
    let (mut frames, fps, audio) = buffer.into_parts();

    frames.par_iter_mut().enumerate().for_each(|(i, frame)| {
        let t = i as f64 / fps;
        let level = match direction {
            FadeDirection::In if t < seconds => t / seconds,
            FadeDirection::Out if t > duration - seconds => (duration - t) / seconds,
            _ => return,
        };
        let level = level.clamp(0.0, 1.0) as f32;
        frame.map_channels(|v| clamp_channel(v as f32 * level));
    });

    MediaBuffer::from_parts(frames, fps, audio)
}

fn reverse(buffer: MediaBuffer) -> MediaBuffer {
    let (mut frames, fps, audio) = buffer.into_parts();
    frames.reverse();
    MediaBuffer::from_parts(frames, fps, audio.map(|track| track.reversed()))
}

/// Dimensions after scaling by `percent`, rounded with a floor of one pixel
pub fn scaled_dimensions(width: u32, height: u32, percent: f64) -> (u32, u32) {
    let scale = |side: u32| ((side as f64 * percent / 100.0).round() as u32).max(1);
    (scale(width), scale(height))
}

/// Resample every frame to exactly `width` x `height`
pub fn resize_frames(buffer: MediaBuffer, width: u32, height: u32) -> MediaBuffer {
    if (buffer.width(), buffer.height()) == (width, height) {
        return buffer;
    }
    map_frames(buffer, move |frame| {
        *frame = Frame::new(imageops::resize(frame.as_image(), width, height, FilterType::Lanczos3));
    })
}

/// Frame size after a `size_px` border on every side
///
/// `None` when the size is negative or the result does not fit in `u32`.
pub fn bordered_dimensions(width: u32, height: u32, size_px: i64) -> Option<(u32, u32)> {
    let grow = u32::try_from(size_px).ok()?.checked_mul(2)?;
    Some((width.checked_add(grow)?, height.checked_add(grow)?))
}

fn with_border(frame: &Frame, width: u32, height: u32, offset: i64) -> Frame {
    if frame.dimensions() == (width, height) {
        return frame.clone();
    }
    let mut canvas = Frame::new_black(width, height);
    imageops::replace(canvas.as_image_mut(), frame.as_image(), offset, offset);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::AudioTrack;

    /// Buffer whose frame `i` is filled with the value `i`
    fn numbered(count: usize, fps: f64) -> MediaBuffer {
        let frames = (0..count).map(|i| Frame::new_filled(4, 2, [i as u8; 3])).collect();
        MediaBuffer::new(frames, fps).unwrap()
    }

    fn frame_values(buffer: &MediaBuffer) -> Vec<u8> {
        buffer.frames().iter().map(|f| f.get_pixel(0, 0)[0]).collect()
    }

    #[test]
    fn test_trim_keeps_frames_in_range() {
        let trimmed = apply_operation(numbered(20, 10.0), &Operation::Trim { start: 0.5, end: 1.2 });
        assert_eq!(frame_values(&trimmed), vec![5, 6, 7, 8, 9, 10, 11]);
        assert!((trimmed.duration() - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_trim_carries_audio() {
        let audio = AudioTrack::new((0..20).map(|v| v as f32).collect(), 10, 1);
        let buffer = numbered(20, 10.0).with_audio(audio);
        let trimmed = apply_operation(buffer, &Operation::Trim { start: 1.0, end: 1.5 });
        assert_eq!(trimmed.audio().unwrap().samples, vec![10.0, 11.0, 12.0, 13.0, 14.0]);
    }

    #[test]
    fn test_trim_bounds_keep_one_frame() {
        assert_eq!(trim_bounds(10, 30.0, 0.0, 0.001), (0, 1));
        assert_eq!(trim_bounds(10, 10.0, 0.0, 5.0), (0, 10));
    }

    #[test]
    fn test_speed_up_and_down() {
        let fast = apply_operation(numbered(10, 10.0), &Operation::SpeedChange { factor: 2.0 });
        assert_eq!(frame_values(&fast), vec![0, 2, 4, 6, 8]);

        let slow = apply_operation(numbered(3, 10.0), &Operation::SpeedChange { factor: 0.5 });
        assert_eq!(frame_values(&slow), vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_grayscale_uses_luma() {
        let buffer = MediaBuffer::solid(2, 2, 1.0, 1, [255, 0, 0]).unwrap();
        let gray = apply_operation(buffer, &Operation::Grayscale);
        assert_eq!(gray.frames()[0].get_pixel(1, 1), [76, 76, 76]);
    }

    #[test]
    fn test_rotate_is_counter_clockwise() {
        let mut frame = Frame::new_black(3, 2);
        frame.set_pixel(2, 0, [255, 255, 255]);
        let buffer = MediaBuffer::new(vec![frame], 1.0).unwrap();

        let rotated = apply_operation(buffer, &Operation::Rotate { angle: 90 });
        assert_eq!(rotated.frames()[0].dimensions(), (2, 3));
        // top-right corner moves to top-left
        assert_eq!(rotated.frames()[0].get_pixel(0, 0), [255, 255, 255]);
    }

    #[test]
    fn test_flips() {
        let mut frame = Frame::new_black(2, 2);
        frame.set_pixel(0, 0, [9, 9, 9]);
        let buffer = MediaBuffer::new(vec![frame], 1.0).unwrap();

        let mirrored = apply_operation(buffer.clone(), &Operation::FlipHorizontal);
        assert_eq!(mirrored.frames()[0].get_pixel(1, 0), [9, 9, 9]);

        let flipped = apply_operation(buffer, &Operation::FlipVertical);
        assert_eq!(flipped.frames()[0].get_pixel(0, 1), [9, 9, 9]);
    }

    #[test]
    fn test_fade_in_and_out() {
        let white = MediaBuffer::solid(1, 1, 2.0, 4, [200, 200, 200]).unwrap();

        let faded_in = apply_operation(white.clone(), &Operation::FadeIn { seconds: 1.0 });
        assert_eq!(frame_values(&faded_in), vec![0, 100, 200, 200]);

        let faded_out = apply_operation(white.clone(), &Operation::FadeOut { seconds: 1.0 });
        assert_eq!(frame_values(&faded_out), vec![200, 200, 200, 100]);

        let untouched = apply_operation(white.clone(), &Operation::FadeIn { seconds: 0.0 });
        assert_eq!(untouched, white);
    }

    #[test]
    fn test_brightness_and_contrast_clamp() {
        let buffer = MediaBuffer::solid(1, 1, 1.0, 1, [100, 200, 27]).unwrap();

        let brighter = apply_operation(buffer.clone(), &Operation::BrightnessAdjust { delta: 0.5 });
        assert_eq!(brighter.frames()[0].get_pixel(0, 0), [150, 255, 41]);

        let contrast = apply_operation(buffer, &Operation::ContrastAdjust { delta: 1.0 });
        assert_eq!(contrast.frames()[0].get_pixel(0, 0), [73, 255, 0]);
    }

    #[test]
    fn test_reverse_frames_and_audio() {
        let audio = AudioTrack::new(vec![1.0, 2.0, 3.0], 3, 1);
        let reversed = apply_operation(numbered(3, 3.0).with_audio(audio), &Operation::Reverse);
        assert_eq!(frame_values(&reversed), vec![2, 1, 0]);
        assert_eq!(reversed.audio().unwrap().samples, vec![3.0, 2.0, 1.0]);
    }

    #[test]
    fn test_resize_rounds_with_minimum() {
        assert_eq!(scaled_dimensions(640, 480, 50.0), (320, 240));
        assert_eq!(scaled_dimensions(3, 3, 1.0), (1, 1));

        let resized = apply_operation(numbered(2, 1.0), &Operation::Resize { percent: 150.0 });
        assert_eq!(resized.frames()[0].dimensions(), (6, 3));
    }

    #[test]
    fn test_border_adds_black_margin() {
        let buffer = MediaBuffer::solid(2, 2, 1.0, 1, [50, 60, 70]).unwrap();
        let framed = apply_operation(buffer, &Operation::Border { size_px: 3 });
        let frame = &framed.frames()[0];
        assert_eq!(frame.dimensions(), (8, 8));
        assert_eq!(frame.get_pixel(0, 0), [0, 0, 0]);
        assert_eq!(frame.get_pixel(3, 3), [50, 60, 70]);
        assert_eq!(frame.get_pixel(5, 5), [0, 0, 0]);
    }

    #[test]
    fn test_bordered_dimensions_never_wrap() {
        assert_eq!(bordered_dimensions(64, 48, 2), Some((68, 52)));
        assert_eq!(bordered_dimensions(64, 48, -1), None);
        assert_eq!(bordered_dimensions(64, 48, i64::MAX), None);
        assert_eq!(bordered_dimensions(64, 48, u32::MAX as i64 / 2), None);

        let buffer = MediaBuffer::solid(4, 4, 1.0, 1, [9, 9, 9]).unwrap();
        let untouched = apply_operation(buffer.clone(), &Operation::Border { size_px: i64::MAX });
        assert_eq!(untouched, buffer);
    }
}
