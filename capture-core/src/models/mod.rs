pub mod config;
pub mod device_models;
pub mod error;
pub mod permission;
pub mod recording_result;
pub mod state;
