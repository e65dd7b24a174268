use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use tracing::{debug, info};

use crate::error::{EditError, Result};
use crate::imaging::kernels;
use crate::imaging::params::ImageParams;
use crate::media::Frame;

/// Prefix of generated image output names
pub const OUTPUT_PREFIX: &str = "image_edit_";

/// Run the fixed adjustment sequence on one image
///
/// Stages run in this order: brightness/contrast, hue/saturation, flip,
/// grayscale, rotation, blur, sharpen, crop. The input is never modified.
pub fn adjust(image: Option<&Frame>, params: &ImageParams) -> Result<Frame> {
    let source = image.ok_or(EditError::NoImage)?;
    params.validate()?;

    let mut frame = source.clone();

    let alpha = 1.0 + params.contrast as f32 / 100.0;
    kernels::convert_scale(&mut frame, alpha, params.brightness as f32);

    if params.hue != 0 || params.saturation != 0 {
        kernels::shift_hue_saturation(&mut frame, params.hue, params.saturation);
    }

    if params.flip {
        image::imageops::flip_horizontal_in_place(frame.as_image_mut());
    }

    if params.grayscale {
        kernels::grayscale(&mut frame);
    }

    if params.rotate_degrees != 0.0 {
        frame = kernels::rotate_about_center(&frame, params.rotate_degrees);
    }

    if params.blur_radius > 0 {
        frame = kernels::gaussian_blur(&frame, params.blur_radius);
    }

    if params.sharpen {
        frame = kernels::convolve3(&frame, &kernels::SHARPEN_KERNEL);
    }

    if params.crop {
        frame = kernels::center_crop(&frame);
    }

    debug!("Adjusted {}x{} image -> {}x{}", source.width(), source.height(), frame.width(), frame.height());
    Ok(frame)
}

/// Decode an image file into an RGB frame
pub fn load_image(path: &Path) -> Result<Frame> {
    let undecodable = || EditError::UndecodableImage {
        path: path.display().to_string(),
    };
    let frame = Frame::new(image::open(path).map_err(|_| undecodable())?.to_rgb8());
    if frame.width() == 0 || frame.height() == 0 {
        return Err(undecodable().into());
    }
    Ok(frame)
}

/// Write `frame` as a JPEG under a fresh `image_edit_*.jpg` name in `dir`
pub fn save_jpeg(frame: &Frame, dir: &Path, quality: u8) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let (file, path) = tempfile::Builder::new()
        .prefix(OUTPUT_PREFIX)
        .suffix(".jpg")
        .tempfile_in(dir)?
        .keep()
        .map_err(|e| e.error)?;

    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, quality)
        .encode_image(frame.as_image())
        .map_err(|e| EditError::encode_fault(path.display(), e.to_string()))?;
    writer.flush()?;

    info!("Wrote {}x{} image to {}", frame.width(), frame.height(), path.display());
    Ok(path)
}

/// Holds an original image and re-renders it whenever the controls change
///
/// Each change starts again from the untouched original, so adjustments
/// never accumulate.
#[derive(Debug, Clone)]
pub struct ImageEditor {
    original: Option<Frame>,
}

impl ImageEditor {
    pub fn new(original: Option<Frame>) -> Self {
        Self { original }
    }

    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Some(load_image(path)?)))
    }

    pub fn original(&self) -> Option<&Frame> {
        self.original.as_ref()
    }

    pub fn on_change(&self, params: &ImageParams) -> Result<Frame> {
        adjust(self.original.as_ref(), params)
    }

    /// Render with `params` and write the result as a JPEG into `dir`
    pub fn render_to(&self, params: &ImageParams, dir: &Path, quality: u8) -> Result<PathBuf> {
        let frame = self.on_change(params)?;
        save_jpeg(&frame, dir, quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::reset_parameters;
    use tempfile::tempdir;

    fn gradient(width: u32, height: u32) -> Frame {
        let mut frame = Frame::new_black(width, height);
        for y in 0..height {
            for x in 0..width {
                frame.set_pixel(x, y, [(x * 40) as u8, (y * 50) as u8, ((x + y) * 20) as u8]);
            }
        }
        frame
    }

    #[test]
    fn test_reset_parameters_are_identity() {
        let image = gradient(6, 5);
        let adjusted = adjust(Some(&image), &reset_parameters()).unwrap();
        assert_eq!(adjusted, image);
    }

    #[test]
    fn test_missing_image() {
        let err = adjust(None, &reset_parameters()).unwrap_err();
        assert_eq!(err.as_edit(), Some(&EditError::NoImage));
        assert_eq!(err.user_message(), "Error: No image uploaded");
    }

    #[test]
    fn test_brightness_and_contrast() {
        let image = Frame::new_filled(2, 2, [100, 200, 10]);
        let params = ImageParams {
            brightness: 20,
            contrast: 50,
            ..reset_parameters()
        };
        let adjusted = adjust(Some(&image), &params).unwrap();
        assert_eq!(adjusted.get_pixel(0, 0), [170, 255, 35]);
    }

    #[test]
    fn test_any_angle_in_range_is_accepted() {
        let image = gradient(5, 5);
        for degrees in [0.0, 1.0, 45.0, 90.0, 179.5, 180.0] {
            let params = ImageParams {
                rotate_degrees: degrees,
                ..reset_parameters()
            };
            let rotated = adjust(Some(&image), &params).unwrap();
            assert_eq!(rotated.dimensions(), (5, 5));
        }
    }

    #[test]
    fn test_out_of_range_params_rejected() {
        let params = ImageParams {
            saturation: -150,
            ..reset_parameters()
        };
        let err = adjust(Some(&gradient(2, 2)), &params).unwrap_err();
        assert!(matches!(err.as_edit(), Some(EditError::InvalidParameter { .. })));
    }

    #[test]
    fn test_crop_runs_last() {
        let params = ImageParams {
            flip: true,
            blur_radius: 1,
            crop: true,
            ..reset_parameters()
        };
        let adjusted = adjust(Some(&gradient(8, 4)), &params).unwrap();
        assert_eq!(adjusted.dimensions(), (4, 4));
    }

    #[test]
    fn test_editor_restarts_from_original() {
        let editor = ImageEditor::new(Some(gradient(4, 4)));
        let dark = ImageParams {
            brightness: -100,
            ..reset_parameters()
        };
        assert_eq!(editor.on_change(&dark).unwrap().get_pixel(0, 0), [0, 0, 0]);
        assert_eq!(&editor.on_change(&reset_parameters()).unwrap(), editor.original().unwrap());
    }

    #[test]
    fn test_render_writes_jpeg() {
        let dir = tempdir().unwrap();
        let editor = ImageEditor::new(Some(gradient(16, 8)));
        let path = editor.render_to(&reset_parameters(), dir.path(), 90).unwrap();

        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(OUTPUT_PREFIX));
        assert!(name.ends_with(".jpg"));

        let reloaded = load_image(&path).unwrap();
        assert_eq!(reloaded.dimensions(), (16, 8));
    }

    #[test]
    fn test_undecodable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not an image").unwrap();

        let err = ImageEditor::open(&path).unwrap_err();
        assert!(matches!(err.as_edit(), Some(EditError::UndecodableImage { .. })));
        assert_eq!(
            err.user_message(),
            "Error: Unable to read image. Ensure it's a valid image file."
        );
    }
}
