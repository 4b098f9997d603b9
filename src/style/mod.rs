//! Style Resolution for Markshot
//!
//! Turns stylesheet text plus a preview tree into concrete values.
//!
//! # Architecture
//!
//! - `resolver.rs` - themed variable substitution for a given `Theme`
//! - `css.rs` - stylesheet and declaration parsing
//! - `selector.rs` - selector parsing and matching over `Document`
//! - `cascade.rs` - computed styles for every element (`StyleMap`)
//! - `color.rs` - CSS color values to pixels

pub mod cascade;
pub mod color;
pub mod css;
pub mod resolver;
pub mod selector;

pub use cascade::{compute_styles, ComputedStyle, StyleMap};
pub use resolver::resolve_themed_variables;
