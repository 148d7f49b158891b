pub mod relay_controller;

pub use relay_controller::RelayController;
