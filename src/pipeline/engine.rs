use std::time::Instant;

use tracing::{debug, info};

use crate::directive::{canonical_order, Operation};
use crate::error::Result;
use crate::media::MediaBuffer;
use crate::pipeline::{stages, validator};

/// Apply a set of operations to a buffer in canonical order
///
/// The whole plan is validated against the projected buffer properties
/// before any stage runs, so a failure never leaves a partially edited
/// buffer behind. An empty plan hands the buffer back untouched.
pub fn apply(buffer: MediaBuffer, ops: &[Operation]) -> Result<MediaBuffer> {
    let plan = canonical_order(ops.to_vec());
    let projected = validator::validate_plan(&plan, buffer.props())?;

    info!(
        "Applying {} operations to {:.2}s {}x{} buffer",
        plan.len(),
        buffer.duration(),
        buffer.width(),
        buffer.height()
    );

    let started = Instant::now();
    let result = plan.iter().fold(buffer, |current, op| {
        let stage_start = Instant::now();
        let next = stages::apply_operation(current, op);
        debug!(
            "Stage {} done in {:.1}ms: {} frames {}x{}",
            op,
            stage_start.elapsed().as_secs_f64() * 1000.0,
            next.frame_count(),
            next.width(),
            next.height()
        );
        next
    });

    debug_assert_eq!((result.width(), result.height()), (projected.width, projected.height));
    info!(
        "Pipeline finished in {:.2}s: {:.2}s {}x{}",
        started.elapsed().as_secs_f64(),
        result.duration(),
        result.width(),
        result.height()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EditError;
    use crate::media::Frame;

    fn ten_second_clip() -> MediaBuffer {
        MediaBuffer::solid(8, 6, 2.0, 20, [120, 120, 120]).unwrap()
    }

    #[test]
    fn test_empty_plan_is_identity() {
        let buffer = ten_second_clip();
        assert_eq!(apply(buffer.clone(), &[]).unwrap(), buffer);
    }

    #[test]
    fn test_fade_longer_than_trimmed_clip_fails() {
        let ops = [
            Operation::FadeIn { seconds: 5.0 },
            Operation::Trim { start: 0.0, end: 3.0 },
        ];
        let err = apply(ten_second_clip(), &ops).unwrap_err();
        assert!(matches!(err.as_edit(), Some(EditError::InvalidParameter { .. })));
    }

    #[test]
    fn test_trim_runs_first_regardless_of_input_order() {
        let ops = [
            Operation::Reverse,
            Operation::Trim { start: 0.0, end: 1.0 },
        ];
        let frames = (0..20).map(|i| Frame::new_filled(2, 2, [i as u8; 3])).collect();
        let buffer = MediaBuffer::new(frames, 2.0).unwrap();

        let result = apply(buffer, &ops).unwrap();
        let values: Vec<u8> = result.frames().iter().map(|f| f.get_pixel(0, 0)[0]).collect();
        assert_eq!(values, vec![1, 0]);
    }

    #[test]
    fn test_invalid_trim_reports_range() {
        let err = apply(ten_second_clip(), &[Operation::Trim { start: 4.0, end: 12.0 }]).unwrap_err();
        assert!(matches!(err.as_edit(), Some(EditError::InvalidRange { .. })));
    }

    #[test]
    fn test_combined_plan() {
        let ops = [
            Operation::Border { size_px: 1 },
            Operation::SpeedChange { factor: 2.0 },
            Operation::Rotate { angle: 270 },
            Operation::Grayscale,
            Operation::Trim { start: 2.0, end: 6.0 },
        ];
        let result = apply(ten_second_clip(), &ops).unwrap();
        assert_eq!(result.duration(), 2.0);
        assert_eq!((result.width(), result.height()), (8, 10));
    }
}
