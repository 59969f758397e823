pub mod cycle_view;
pub mod help_view;
pub mod status_bar;

pub use cycle_view::{render_cycle_view, CycleViewState};
pub use help_view::render_help_view;
pub use status_bar::render_status_bar;
