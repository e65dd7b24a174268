//! # Image Adjustment
//!
//! Single-image editing driven by an [`ImageParams`] snapshot. The engine is
//! a pure function of the original image and the current controls.

pub mod engine;
pub mod kernels;
pub mod params;

pub use engine::{adjust, load_image, save_jpeg, ImageEditor};
pub use params::{reset_parameters, ImageParams};
