//! Lumen UI: the operator overlay and the world loop driving a scene.
//!
//! [`Gui`] renders help, profiling, log, timing graph and a camera preview
//! into an offscreen target. [`Application`] owns the scene and the overlay,
//! applies serialized image updates sent by producer threads, renders every
//! camera and presents the result in a window.
//!
//! ```rust,ignore
//! use lumen_engine::logging::{init_logging, LoggingConfig};
//! use lumen_ui::Application;
//!
//! let logs = init_logging(LoggingConfig::default());
//! Application::new(scene, logs)
//!     .title("lumen")
//!     .font(font_bytes)
//!     .run()?;
//! ```

pub mod app;
pub mod draw;
pub mod event;
pub mod geometry;
pub mod gui;
pub mod layout;
pub mod painter;
pub mod render;
pub mod style;
pub mod widget;
pub mod widgets;

pub use app::{Application, ImageUpdate, MessageHandler};
pub use gui::Gui;

/// Types needed to write an overlay widget.
pub mod prelude {
    pub use crate::event::{EventResult, UiEvent};
    pub use crate::geometry::{Color, Rect};
    pub use crate::painter::Painter;
    pub use crate::widget::{FrameInfo, PreviewImage, Widget};
    pub use crate::widgets::{CameraView, GraphView, HelpView, LogView, ProfileView};
}
