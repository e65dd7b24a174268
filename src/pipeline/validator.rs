use tracing::debug;

use crate::directive::Operation;
use crate::error::{EditError, Result};
use crate::media::BufferProps;
use crate::pipeline::stages;

/// Largest frame side any stage may produce
pub const MAX_DIMENSION: u32 = 16_384;

/// Most frames a slow-down may produce
///
/// Two hours at 30 fps. Speed-ups and slow-downs of longer sources that do
/// not add frames are not limited.
pub const MAX_RETIMED_FRAMES: usize = 216_000;

/// Slack for float noise when comparing times against a duration
const TIME_EPSILON: f64 = 1e-9;

/// Check `0 <= start < end <= duration`
pub fn validate_range(operation: &str, start: f64, end: f64, duration: f64) -> Result<()> {
    let ok = start.is_finite()
        && end.is_finite()
        && start >= 0.0
        && start < end
        && end <= duration + TIME_EPSILON;

    if ok {
        Ok(())
    } else {
        Err(EditError::InvalidRange {
            operation: operation.to_string(),
            start,
            end,
            duration,
        }
        .into())
    }
}

/// Check one operation against the buffer it will be applied to
pub fn validate(op: &Operation, props: &BufferProps) -> Result<()> {
    match *op {
        Operation::Trim { start, end } => validate_range(op.name(), start, end, props.duration),
        Operation::SpeedChange { factor } => {
            if !(factor.is_finite() && factor > 0.0) {
                return Err(EditError::invalid_parameter(op.name(), format!("factor must be positive, got {}", factor)).into());
            }
            let before = frame_count(props);
            let after = stages::retimed_frame_count(before, factor);
            if after > before && after > MAX_RETIMED_FRAMES {
                return Err(EditError::invalid_parameter(
                    op.name(),
                    format!("result of {} frames exceeds the {} frame limit", after, MAX_RETIMED_FRAMES),
                )
                .into());
            }
            Ok(())
        }
        Operation::Rotate { angle } => {
            if matches!(angle, 90 | 180 | 270) {
                Ok(())
            } else {
                Err(EditError::invalid_parameter(op.name(), format!("angle must be 90, 180 or 270, got {}", angle)).into())
            }
        }
        Operation::FadeIn { seconds } | Operation::FadeOut { seconds } => {
            if seconds.is_finite() && seconds >= 0.0 && seconds <= props.duration + TIME_EPSILON {
                Ok(())
            } else {
                Err(EditError::invalid_parameter(
                    op.name(),
                    format!("{}s must be within the {:.2}s clip", seconds, props.duration),
                )
                .into())
            }
        }
        Operation::BrightnessAdjust { delta } | Operation::ContrastAdjust { delta } => {
            if delta.is_finite() {
                Ok(())
            } else {
                Err(EditError::invalid_parameter(op.name(), "amount must be a finite number").into())
            }
        }
        Operation::Resize { percent } => {
            if !(percent.is_finite() && percent > 0.0) {
                return Err(EditError::invalid_parameter(op.name(), format!("percent must be positive, got {}", percent)).into());
            }
            let (width, height) = stages::scaled_dimensions(props.width, props.height, percent);
            check_dimensions(op, width as u64, height as u64)
        }
        Operation::Border { size_px } => {
            if size_px < 0 {
                return Err(EditError::invalid_parameter(op.name(), format!("size must not be negative, got {}", size_px)).into());
            }
            match stages::bordered_dimensions(props.width, props.height, size_px) {
                Some((width, height)) => check_dimensions(op, width as u64, height as u64),
                None => Err(EditError::invalid_parameter(
                    op.name(),
                    format!("size {} exceeds {} pixels per side", size_px, MAX_DIMENSION),
                )
                .into()),
            }
        }
        Operation::Grayscale | Operation::FlipHorizontal | Operation::FlipVertical | Operation::Reverse => Ok(()),
    }
}

fn check_dimensions(op: &Operation, width: u64, height: u64) -> Result<()> {
    if width > MAX_DIMENSION as u64 || height > MAX_DIMENSION as u64 {
        return Err(EditError::invalid_parameter(
            op.name(),
            format!("result {}x{} exceeds {} pixels per side", width, height, MAX_DIMENSION),
        )
        .into());
    }
    Ok(())
}

/// Properties of the buffer after `op` has been applied
///
/// Must agree with what the stage actually does, since fades are validated
/// against the projected duration.
pub fn project(op: &Operation, props: BufferProps) -> BufferProps {
    let frame_count = frame_count(&props);
    let with_frames = |count: usize| BufferProps {
        duration: count as f64 / props.fps,
        ..props
    };

    match *op {
        Operation::Trim { start, end } => {
            let (first, last) = stages::trim_bounds(frame_count, props.fps, start, end);
            with_frames(last - first)
        }
        Operation::SpeedChange { factor } => with_frames(stages::retimed_frame_count(frame_count, factor)),
        Operation::Rotate { angle: 90 | 270 } => BufferProps {
            width: props.height,
            height: props.width,
            ..props
        },
        Operation::Resize { percent } => {
            let (width, height) = stages::scaled_dimensions(props.width, props.height, percent);
            BufferProps { width, height, ..props }
        }
        Operation::Border { size_px } => {
            let (width, height) =
                stages::bordered_dimensions(props.width, props.height, size_px).unwrap_or((props.width, props.height));
            BufferProps { width, height, ..props }
        }
        _ => props,
    }
}

fn frame_count(props: &BufferProps) -> usize {
    (props.duration * props.fps).round() as usize
}

/// Validate a whole canonical-order plan before any pixels are touched
///
/// Threads the projected properties through every operation and stops at
/// the first violation. Returns the properties of the final buffer.
pub fn validate_plan(ops: &[Operation], props: BufferProps) -> Result<BufferProps> {
    ops.iter().try_fold(props, |current, op| {
        validate(op, &current)?;
        let next = project(op, current);
        debug!("Validated {}: {:.3}s {}x{}", op, next.duration, next.width, next.height);
        Ok(next)
    })
}
