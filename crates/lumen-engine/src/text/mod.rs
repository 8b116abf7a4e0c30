//! Font loading and text measurement for overlay rendering.

mod font_system;

pub use font_system::{FontError, FontId, FontSystem};
