//! Live preview module for Markshot
//!
//! Renders markdown into the themed preview tree the exporter captures.
//! The container is always `div#preview-content.markdown-content.theme-<id>`.

mod render;

pub use render::{
    base_css, render_preview, BASE_STYLESHEET_ID, PREVIEW_CONTENT_ID, THEME_STYLESHEET_ID,
    WELCOME_MARKDOWN,
};
