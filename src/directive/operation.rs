use std::fmt;

use serde::{Deserialize, Serialize};

/// A single typed edit operation
///
/// Produced by the directive lexer and consumed by the transform pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    Trim { start: f64, end: f64 },
    Grayscale,
    SpeedChange { factor: f64 },
    Rotate { angle: u32 },
    FlipHorizontal,
    FlipVertical,
    FadeIn { seconds: f64 },
    FadeOut { seconds: f64 },
    BrightnessAdjust { delta: f64 },
    ContrastAdjust { delta: f64 },
    Reverse,
    Resize { percent: f64 },
    Border { size_px: i64 },
}

/// Stage slots in canonical application order
///
/// The derived `Ord` is the application order, so declaration order here is
/// load-bearing. Fade in and fade out share a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Trim,
    Grayscale,
    Speed,
    Rotate,
    FlipHorizontal,
    FlipVertical,
    Fade,
    Brightness,
    Contrast,
    Reverse,
    Resize,
    Border,
}

impl Operation {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Trim { .. } => Stage::Trim,
            Self::Grayscale => Stage::Grayscale,
            Self::SpeedChange { .. } => Stage::Speed,
            Self::Rotate { .. } => Stage::Rotate,
            Self::FlipHorizontal => Stage::FlipHorizontal,
            Self::FlipVertical => Stage::FlipVertical,
            Self::FadeIn { .. } | Self::FadeOut { .. } => Stage::Fade,
            Self::BrightnessAdjust { .. } => Stage::Brightness,
            Self::ContrastAdjust { .. } => Stage::Contrast,
            Self::Reverse => Stage::Reverse,
            Self::Resize { .. } => Stage::Resize,
            Self::Border { .. } => Stage::Border,
        }
    }

    /// Short operation name used in failure messages and logs
    pub fn name(&self) -> &'static str {
        match self {
            Self::Trim { .. } => "trim",
            Self::Grayscale => "grayscale",
            Self::SpeedChange { .. } => "speed change",
            Self::Rotate { .. } => "rotate",
            Self::FlipHorizontal => "flip horizontal",
            Self::FlipVertical => "flip vertical",
            Self::FadeIn { .. } => "fade in",
            Self::FadeOut { .. } => "fade out",
            Self::BrightnessAdjust { .. } => "brightness",
            Self::ContrastAdjust { .. } => "contrast",
            Self::Reverse => "reverse",
            Self::Resize { .. } => "resize",
            Self::Border { .. } => "border",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trim { start, end } => write!(f, "trim {}s-{}s", start, end),
            Self::SpeedChange { factor } => write!(f, "speed x{}", factor),
            Self::Rotate { angle } => write!(f, "rotate {}", angle),
            Self::FadeIn { seconds } => write!(f, "fade in {}s", seconds),
            Self::FadeOut { seconds } => write!(f, "fade out {}s", seconds),
            Self::BrightnessAdjust { delta } => write!(f, "brightness {:+}", delta),
            Self::ContrastAdjust { delta } => write!(f, "contrast {:+}", delta),
            Self::Resize { percent } => write!(f, "resize {}%", percent),
            Self::Border { size_px } => write!(f, "border {}px", size_px),
            other => f.write_str(other.name()),
        }
    }
}

/// Stable sort into canonical application order
pub fn canonical_order(mut ops: Vec<Operation>) -> Vec<Operation> {
    ops.sort_by_key(Operation::stage);
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_order_is_independent_of_input_order() {
        let ops = vec![
            Operation::Border { size_px: 4 },
            Operation::FadeIn { seconds: 2.0 },
            Operation::Reverse,
            Operation::Trim { start: 0.0, end: 3.0 },
            Operation::Grayscale,
            Operation::Resize { percent: 50.0 },
        ];

        let ordered = canonical_order(ops);
        let stages: Vec<Stage> = ordered.iter().map(Operation::stage).collect();
        assert_eq!(
            stages,
            vec![Stage::Trim, Stage::Grayscale, Stage::Fade, Stage::Reverse, Stage::Resize, Stage::Border]
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(Operation::Rotate { angle: 90 }.to_string(), "rotate 90");
        assert_eq!(Operation::BrightnessAdjust { delta: -0.5 }.to_string(), "brightness -0.5");
        assert_eq!(Operation::Reverse.to_string(), "reverse");
    }

    #[test]
    fn test_serializes_with_tag() {
        let json = serde_json::to_string(&Operation::Trim { start: 1.0, end: 2.0 }).unwrap();
        assert_eq!(json, r#"{"op":"trim","start":1.0,"end":2.0}"#);
    }
}
