pub mod capture_session;
pub mod controller;
pub mod negotiator;
pub mod output_sink;
pub mod recording_session;
pub mod timer;
