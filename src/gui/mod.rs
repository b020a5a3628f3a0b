//! GUI module - user interface components

mod app;
mod control_panel;
mod page_view;

pub use app::CovidApp;
pub use control_panel::{ControlPanel, ControlPanelAction, ViewSettings};
pub use page_view::PageView;
