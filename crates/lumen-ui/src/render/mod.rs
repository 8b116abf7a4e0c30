//! GPU side of the overlay: glyph atlas and the quad renderer.

mod atlas;
mod overlay;

pub use overlay::OverlayRenderer;
