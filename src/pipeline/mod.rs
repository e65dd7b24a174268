//! # Transform Pipeline
//!
//! Validates and applies [`Operation`](crate::directive::Operation)s to a
//! [`MediaBuffer`](crate::media::MediaBuffer) in canonical order.
//!
//! - [`validator`] checks each operation against the buffer it will see
//! - [`stages`] holds the per-operation transforms
//! - [`engine`] runs a whole plan
//! - [`variants`] covers the cut, merge and resolution entry points

pub mod engine;
pub mod stages;
pub mod validator;
pub mod variants;

pub use engine::apply;
pub use validator::{validate, validate_plan, validate_range};
pub use variants::{change_resolution, cut_segments, merge, require_all, Quality};
