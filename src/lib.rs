//! # Clipforge
//!
//! Edit videos and images with plain-text instructions.
//!
//! Instructions like `"trim 0 to 5, grayscale, speed up 2"` are turned into
//! typed operations, validated against the decoded media, and applied in a
//! fixed canonical order. Media is decoded and encoded through the system
//! `ffmpeg` binaries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use clipforge::{config::Config, editor::Editor};
//!
//! # fn main() -> anyhow::Result<()> {
//! let editor = Editor::with_ffmpeg(Config::default())?;
//! let result = editor.edit_video(Some(Path::new("clip.mp4")), "trim 0 to 5, grayscale");
//! println!("{}: {:?}", result.message, result.outputs);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`directive`] - Instruction text to [`Operation`]s
//! - [`pipeline`] - Validation and the ordered transform stages
//! - [`imaging`] - Single-image adjustments
//! - [`media`] - Buffers and the decode/encode collaborators
//! - [`editor`] - Request facade producing [`EditResult`]s
//! - [`config`] - Configuration management
//!
//! ## Working on buffers directly
//!
//! The pipeline does not need ffmpeg; any [`MediaBuffer`] can be edited:
//!
//! ```rust
//! use clipforge::{directive, media::MediaBuffer, pipeline};
//!
//! let buffer = MediaBuffer::solid(64, 48, 25.0, 250, [200, 40, 40]).unwrap();
//! let ops = directive::extract("trim 2 to 6 and flip vertically");
//! let edited = pipeline::apply(buffer, &ops).unwrap();
//! assert_eq!(edited.duration(), 4.0);
//! ```

pub mod config;
pub mod directive;
pub mod editor;
pub mod error;
pub mod imaging;
pub mod media;
pub mod output;
pub mod pipeline;

// Re-export commonly used types for convenience
pub use crate::{
    config::Config,
    directive::Operation,
    editor::{EditResult, EditStatus, Editor},
    error::{EditError, EditorError, Result},
    imaging::ImageParams,
    media::MediaBuffer,
};
