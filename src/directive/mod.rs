//! # Directive Parsing
//!
//! Turns plain-text edit instructions ("trim 0 to 5, grayscale, speed up 2")
//! into typed [`Operation`]s in canonical application order.

pub mod lexer;
pub mod operation;

pub use lexer::extract;
pub use operation::{canonical_order, Operation, Stage};
