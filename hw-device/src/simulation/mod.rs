//! Simulated device for tests and offline runs

mod simulated_device;

pub use simulated_device::{SimulatedDevice, DEFAULT_SIMULATED_ACCOUNTS};
