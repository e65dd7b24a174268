use serde::{Deserialize, Serialize};

use crate::error::{EditError, Result};

/// Range shared by the brightness, contrast, hue and saturation controls
pub const ADJUST_RANGE: (i32, i32) = (-100, 100);

pub const MAX_ROTATE_DEGREES: f64 = 180.0;
pub const MAX_BLUR_RADIUS: u32 = 10;

/// One snapshot of the image adjustment controls
///
/// The default is the identity: running the engine with it leaves the
/// image untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageParams {
    pub brightness: i32,
    pub contrast: i32,
    pub hue: i32,
    pub saturation: i32,
    pub flip: bool,
    pub grayscale: bool,
    /// Counter-clockwise, about the image center
    pub rotate_degrees: f64,
    pub blur_radius: u32,
    pub sharpen: bool,
    pub crop: bool,
}

/// Parameters that leave every image unchanged
pub fn reset_parameters() -> ImageParams {
    ImageParams::default()
}

impl ImageParams {
    pub fn validate(&self) -> Result<()> {
        let (low, high) = ADJUST_RANGE;
        for (name, value) in [
            ("brightness", self.brightness),
            ("contrast", self.contrast),
            ("hue", self.hue),
            ("saturation", self.saturation),
        ] {
            if !(low..=high).contains(&value) {
                return Err(EditError::invalid_parameter(
                    name,
                    format!("{} is outside {}..={}", value, low, high),
                )
                .into());
            }
        }

        if !(0.0..=MAX_ROTATE_DEGREES).contains(&self.rotate_degrees) {
            return Err(EditError::invalid_parameter(
                "rotate",
                format!("{} is outside 0..={} degrees", self.rotate_degrees, MAX_ROTATE_DEGREES),
            )
            .into());
        }

        if self.blur_radius > MAX_BLUR_RADIUS {
            return Err(EditError::invalid_parameter(
                "blur",
                format!("radius {} exceeds {}", self.blur_radius, MAX_BLUR_RADIUS),
            )
            .into());
        }

        Ok(())
    }

    pub fn is_identity(&self) -> bool {
        *self == reset_parameters()
    }
}
