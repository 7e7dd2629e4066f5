pub mod capture_hardware;
pub mod controller_delegate;
pub mod hardware_session;
pub mod media_library;
pub mod permission_provider;
