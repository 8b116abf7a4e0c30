//! The fixed widget set of the control overlay.

mod camera_view;
mod graph_view;
mod help_view;
mod log_view;
mod profile_view;
mod text_box;

pub use camera_view::{CameraView, Navigation};
pub use graph_view::{GraphView, History};
pub use help_view::HelpView;
pub use log_view::LogView;
pub use profile_view::{ProfileView, Smoothed};
