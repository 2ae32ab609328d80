pub mod ui;

pub use ui::{draw, DashboardState, Tab, UIState};
