//! # capture-core
//!
//! Platform-agnostic camera capture core.
//!
//! Provides permission gating, device negotiation, transactional session
//! configuration and the recording state machine. Platform backends implement
//! `CaptureHardware`, `PermissionProvider` and `MediaLibrary` and plug into the
//! generic `RecordingController`.
//!
//! ## Architecture
//!
//! ```text
//! capture-core (this crate)
//! ├── traits/       ← CaptureHardware, HardwareSession, PermissionProvider, MediaLibrary, ControllerDelegate
//! ├── models/       ← CaptureError, ControllerState, CaptureConfiguration, devices, permissions, results
//! ├── permissions/  ← PermissionGate (memoized per-resource authorization)
//! ├── session/      ← DeviceNegotiator, CaptureSession, OutputSink, DurationTimer, RecordingController
//! ├── export/       ← ExportGateway (media-library persistence)
//! └── storage/      ← checksums, output paths, metadata sidecars
//! ```

pub mod export;
pub mod models;
pub mod permissions;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use export::gateway::ExportGateway;
pub use models::config::{CaptureConfiguration, SessionConfig};
pub use models::device_models::{
    CaptureDeviceDescriptor, DeviceInput, DeviceKind, DevicePosition, FlashMode, MediaKind, QualityPreset,
    StabilizationMode,
};
pub use models::error::{CaptureError, ExportError};
pub use models::permission::{PermissionResource, PermissionStatus};
pub use models::recording_result::{RecordedMedia, RecordingCompletion, RecordingMetadata, RecordingResult};
pub use models::state::ControllerState;
pub use permissions::gate::PermissionGate;
pub use session::controller::{ControllerHandle, ControllerSnapshot, RecordingController, StartOutcome};
pub use session::output_sink::CompletionHandle;
pub use traits::capture_hardware::CaptureHardware;
pub use traits::controller_delegate::ControllerDelegate;
pub use traits::hardware_session::HardwareSession;
pub use traits::media_library::MediaLibrary;
pub use traits::permission_provider::PermissionProvider;
