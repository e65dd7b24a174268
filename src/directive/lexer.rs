use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::directive::operation::{canonical_order, Operation};

/// Angles recognized after "rotate", checked in this order
const ROTATE_ANGLES: [u32; 3] = [90, 180, 270];

const GRAYSCALE_TERMS: [&str; 2] = ["grayscale", "black and white"];

/// Extract edit operations from free-form instruction text
///
/// Every pattern family is scanned once, case-insensitively, and contributes
/// at most one operation (the first match). A number that matches a pattern
/// but fails to parse drops only that operation. The result is in canonical
/// application order, not text order.
pub fn extract(text: &str) -> Vec<Operation> {
    let lowered = text.to_lowercase();

    let candidates = [
        parse_trim(text),
        parse_grayscale(&lowered),
        parse_speed(text),
        parse_rotate(&lowered),
        parse_flip_horizontal(text),
        parse_flip_vertical(text),
        parse_fade(text),
        parse_brightness(text),
        parse_contrast(text),
        parse_reverse(&lowered),
        parse_resize(text),
        parse_border(text),
    ];

    let ops = canonical_order(candidates.into_iter().flatten().collect());
    debug!("Extracted {} operations from {:?}", ops.len(), text);
    ops
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn parse_trim(raw: &str) -> Option<Operation> {
    static TRIM_RE: OnceLock<Regex> = OnceLock::new();
    let re = TRIM_RE.get_or_init(|| {
        Regex::new(r"(?i)trim\s*(\d+)\s*(?:to|-)\s*(\d+)").expect("trim regex should compile")
    });
    let capture = re.captures(raw)?;
    let start = capture.get(1)?.as_str().parse::<u64>().ok()?;
    let end = capture.get(2)?.as_str().parse::<u64>().ok()?;
    Some(Operation::Trim {
        start: start as f64,
        end: end as f64,
    })
}

fn parse_grayscale(lowered: &str) -> Option<Operation> {
    contains_any(lowered, &GRAYSCALE_TERMS).then_some(Operation::Grayscale)
}

fn parse_speed(raw: &str) -> Option<Operation> {
    static SPEED_RE: OnceLock<Regex> = OnceLock::new();
    let re = SPEED_RE.get_or_init(|| {
        Regex::new(r"(?i)speed\s*(up|down)\s*(\d+\.?\d*)").expect("speed regex should compile")
    });
    let capture = re.captures(raw)?;
    let up = capture.get(1)?.as_str().eq_ignore_ascii_case("up");
    let value = capture.get(2)?.as_str().parse::<f64>().ok()?;
    Some(Operation::SpeedChange {
        factor: if up { value } else { 1.0 / value },
    })
}

fn parse_rotate(lowered: &str) -> Option<Operation> {
    ROTATE_ANGLES
        .iter()
        .find(|angle| lowered.contains(&format!("rotate {}", angle)))
        .map(|&angle| Operation::Rotate { angle })
}

fn parse_flip_horizontal(raw: &str) -> Option<Operation> {
    static MIRROR_RE: OnceLock<Regex> = OnceLock::new();
    let re = MIRROR_RE.get_or_init(|| {
        Regex::new(r"(?i)\bmirror\b|flip\s+horizontal(?:ly)?").expect("mirror regex should compile")
    });
    re.is_match(raw).then_some(Operation::FlipHorizontal)
}

fn parse_flip_vertical(raw: &str) -> Option<Operation> {
    static FLIP_V_RE: OnceLock<Regex> = OnceLock::new();
    let re = FLIP_V_RE.get_or_init(|| {
        Regex::new(r"(?i)flip\s+vertical(?:ly)?").expect("vertical flip regex should compile")
    });
    re.is_match(raw).then_some(Operation::FlipVertical)
}

fn parse_fade(raw: &str) -> Option<Operation> {
    static FADE_RE: OnceLock<Regex> = OnceLock::new();
    let re = FADE_RE.get_or_init(|| {
        Regex::new(r"(?i)fade\s+(in|out)\s+(\d+)\s*seconds?").expect("fade regex should compile")
    });
    let capture = re.captures(raw)?;
    let seconds = capture.get(2)?.as_str().parse::<u64>().ok()? as f64;
    if capture.get(1)?.as_str().eq_ignore_ascii_case("in") {
        Some(Operation::FadeIn { seconds })
    } else {
        Some(Operation::FadeOut { seconds })
    }
}

/// Shared shape of the brightness and contrast directives
fn parse_adjustment(re: &Regex, raw: &str) -> Option<f64> {
    let capture = re.captures(raw)?;
    let amount = capture.get(2)?.as_str().parse::<f64>().ok()?;
    if capture.get(1)?.as_str().eq_ignore_ascii_case("increase") {
        Some(amount)
    } else {
        Some(-amount)
    }
}

fn parse_brightness(raw: &str) -> Option<Operation> {
    static BRIGHTNESS_RE: OnceLock<Regex> = OnceLock::new();
    let re = BRIGHTNESS_RE.get_or_init(|| {
        Regex::new(r"(?i)brightness\s+(increase|decrease)\s+(\d+\.?\d*)")
            .expect("brightness regex should compile")
    });
    parse_adjustment(re, raw).map(|delta| Operation::BrightnessAdjust { delta })
}

fn parse_contrast(raw: &str) -> Option<Operation> {
    static CONTRAST_RE: OnceLock<Regex> = OnceLock::new();
    let re = CONTRAST_RE.get_or_init(|| {
        Regex::new(r"(?i)contrast\s+(increase|decrease)\s+(\d+\.?\d*)")
            .expect("contrast regex should compile")
    });
    // Contrast directives are in tenths of the gain applied around mid-gray
    parse_adjustment(re, raw).map(|amount| Operation::ContrastAdjust { delta: amount * 10.0 })
}

fn parse_reverse(lowered: &str) -> Option<Operation> {
    lowered.contains("reverse").then_some(Operation::Reverse)
}

fn parse_resize(raw: &str) -> Option<Operation> {
    static RESIZE_RE: OnceLock<Regex> = OnceLock::new();
    let re = RESIZE_RE.get_or_init(|| {
        Regex::new(r"(?i)resize\s+(\d+)\s*%").expect("resize regex should compile")
    });
    let capture = re.captures(raw)?;
    let percent = capture.get(1)?.as_str().parse::<u64>().ok()?;
    Some(Operation::Resize {
        percent: percent as f64,
    })
}

fn parse_border(raw: &str) -> Option<Operation> {
    static BORDER_RE: OnceLock<Regex> = OnceLock::new();
    let re = BORDER_RE.get_or_init(|| {
        Regex::new(r"(?i)border\s+(\d+)").expect("border regex should compile")
    });
    let capture = re.captures(raw)?;
    let size_px = capture.get(1)?.as_str().parse::<i64>().ok()?;
    Some(Operation::Border { size_px })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_sentence() {
        let ops = extract("Trim 0 to 5, add grayscale, speed up 2x");
        assert_eq!(
            ops,
            vec![
                Operation::Trim { start: 0.0, end: 5.0 },
                Operation::Grayscale,
                Operation::SpeedChange { factor: 2.0 },
            ]
        );
    }

    #[test]
    fn test_output_order_ignores_text_order() {
        let ops = extract("border 10, reverse, fade in 2 seconds, trim 1-4");
        assert_eq!(
            ops,
            vec![
                Operation::Trim { start: 1.0, end: 4.0 },
                Operation::FadeIn { seconds: 2.0 },
                Operation::Reverse,
                Operation::Border { size_px: 10 },
            ]
        );
    }

    #[test]
    fn test_duplicate_keywords_yield_one_operation() {
        assert_eq!(extract("grayscale grayscale"), vec![Operation::Grayscale]);
        assert_eq!(
            extract("GRAYSCALE and black and white"),
            vec![Operation::Grayscale]
        );
    }

    #[test]
    fn test_first_match_wins() {
        let ops = extract("trim 1 to 2 then trim 3 to 9");
        assert_eq!(ops, vec![Operation::Trim { start: 1.0, end: 2.0 }]);

        let ops = extract("fade out 3 seconds and fade in 1 second");
        assert_eq!(ops, vec![Operation::FadeOut { seconds: 3.0 }]);
    }

    #[test]
    fn test_rotate_only_recognizes_right_angles() {
        assert!(extract("rotate 45").is_empty());
        assert_eq!(extract("Rotate 270"), vec![Operation::Rotate { angle: 270 }]);
        // angles are checked in numeric order, not text order
        assert_eq!(
            extract("rotate 270 then rotate 180"),
            vec![Operation::Rotate { angle: 180 }]
        );
    }

    #[test]
    fn test_speed_down_inverts_factor() {
        assert_eq!(
            extract("speed down 4"),
            vec![Operation::SpeedChange { factor: 0.25 }]
        );
        assert_eq!(
            extract("SPEED UP 1.5"),
            vec![Operation::SpeedChange { factor: 1.5 }]
        );
    }

    #[test]
    fn test_brightness_and_contrast_signs() {
        let ops = extract("brightness decrease 0.3 and contrast increase 0.5");
        assert_eq!(
            ops,
            vec![
                Operation::BrightnessAdjust { delta: -0.3 },
                Operation::ContrastAdjust { delta: 5.0 },
            ]
        );
    }

    #[test]
    fn test_flips() {
        assert_eq!(extract("mirror effect"), vec![Operation::FlipHorizontal]);
        assert_eq!(
            extract("flip horizontally and flip vertically"),
            vec![Operation::FlipHorizontal, Operation::FlipVertical]
        );
        assert_eq!(extract("flip vertical"), vec![Operation::FlipVertical]);
    }

    #[test]
    fn test_resize_and_border() {
        assert_eq!(
            extract("resize 150% with border 8"),
            vec![Operation::Resize { percent: 150.0 }, Operation::Border { size_px: 8 }]
        );
    }

    #[test]
    fn test_unparseable_number_drops_only_that_operation() {
        let huge = "99999999999999999999999";
        let ops = extract(&format!("trim 0 to {} and reverse", huge));
        assert_eq!(ops, vec![Operation::Reverse]);
    }

    #[test]
    fn test_no_directives() {
        assert!(extract("make it look nice").is_empty());
        assert!(extract("").is_empty());
    }
}
