pub mod alert;
pub mod api;
pub mod config;
pub mod model;
pub mod portfolio;
pub mod ui;
pub mod wallet;
